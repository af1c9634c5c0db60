use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::purchases::PurchaseLineInput,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

// Serialize is required by the length validator on the containing Vec.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseLineRequest {
    pub product_id: i64,
    /// Units received; must be positive.
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub expiration_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseRequest {
    pub supplier_id: i64,
    pub purchase_date: NaiveDate,
    pub registered_by: Option<i64>,
    #[validate(length(min = 1))]
    pub lines: Vec<PurchaseLineRequest>,
}

/// Record a purchase (header, lines and receiving batches in one transaction)
async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let lines = payload
        .lines
        .into_iter()
        .map(|line| PurchaseLineInput {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_cost: line.unit_cost,
            expiration_date: line.expiration_date,
        })
        .collect();

    let recorded = state
        .services
        .purchases
        .record_purchase(
            payload.supplier_id,
            payload.purchase_date,
            payload.registered_by,
            lines,
        )
        .await
        .map_err(map_service_error)?;

    info!(
        "Purchase recorded: {} (total {})",
        recorded.purchase.id, recorded.purchase.total
    );

    Ok(created_response(serde_json::json!({
        "purchase": recorded.purchase,
        "lines": recorded.lines,
        "batches": recorded.batches,
    })))
}

/// Get a purchase with its lines
async fn get_purchase(
    State(state): State<Arc<AppState>>,
    Path(purchase_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (purchase, lines) = state
        .services
        .purchases
        .get_purchase(purchase_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "purchase": purchase,
        "lines": lines,
    })))
}

/// List purchases, newest first
async fn list_purchases(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let purchases = state
        .services
        .purchases
        .list_purchases()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(purchases))
}

/// Delete a purchase and everything it created
async fn delete_purchase(
    State(state): State<Arc<AppState>>,
    Path(purchase_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .services
        .purchases
        .delete_purchase(purchase_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase deleted: {}", purchase_id);

    Ok(success_response(serde_json::json!({
        "purchase_id": deleted.purchase_id,
        "lines_deleted": deleted.lines_deleted,
        "batches_deleted": deleted.batches_deleted,
    })))
}

/// Creates the router for purchase endpoints
pub fn purchase_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_purchase))
        .route("/", get(list_purchases))
        .route("/:id", get(get_purchase))
        .route("/:id", delete(delete_purchase))
}
