use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FarmaLink API",
        version = "1.0.0",
        description = r#"
# FarmaLink Pharmacy Inventory API

Backend for pharmacy inventory management: product catalog, suppliers,
purchase recording, per-batch stock ledger with expiration dates, and a
stock-low / near-expiry / expired alerting layer.

## Conventions

- All endpoints live under `/api/v1`.
- Errors use a consistent envelope:

```json
{
  "error": "Not Found",
  "message": "Batch with ID 42 not found",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

- Stock mutations are optimistic: a concurrent modification yields `409 Conflict`
  and the caller retries with fresh data.
        "#
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Categories", description = "Product category endpoints"),
        (name = "Suppliers", description = "Supplier endpoints"),
        (name = "Users", description = "Registering-user directory endpoints"),
        (name = "Purchases", description = "Purchase recording endpoints"),
        (name = "Batches", description = "Stock ledger and adjustment endpoints"),
        (name = "Alerts", description = "Alert projections, scan and lifecycle endpoints"),
        (name = "Queries", description = "Read-only query catalog endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    components(
        schemas(
            // Catalog types
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::products::CategoryRequest,

            // Supplier types
            crate::handlers::suppliers::CreateSupplierRequest,
            crate::handlers::suppliers::UpdateSupplierRequest,

            // User types
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,

            // Purchase types
            crate::handlers::purchases::CreatePurchaseRequest,
            crate::handlers::purchases::PurchaseLineRequest,

            // Batch types
            crate::handlers::batches::AdjustBatchRequest,

            // Alert types
            crate::handlers::alerts::CreateAlertRequest,
            crate::handlers::alerts::AlertActionRequest,
            crate::services::alerts::StockLowRow,
            crate::services::alerts::NearExpiryRow,
            crate::services::alerts::ExpiredRow,
            crate::services::alerts::ScanSummary,

            // Query catalog types
            crate::handlers::queries::RunQueryRequest,
            crate::services::query_catalog::QueryDef,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("FarmaLink API"));
        assert!(json.contains("ScanSummary"));
    }
}
