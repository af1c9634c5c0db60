use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    entities::product::ProductStatus,
    errors::ApiError,
    handlers::AppState,
    services::catalog::{NewProduct, ProductFilter, ProductUpdate},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: i64,
    #[validate(range(min = 0))]
    pub stock_threshold: i32,
    /// ACTIVE or INACTIVE; defaults to ACTIVE.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub code: Option<Option<String>>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category_id: Option<i64>,
    #[validate(range(min = 0))]
    pub stock_threshold: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

fn parse_status(raw: &str) -> Result<ProductStatus, ApiError> {
    ProductStatus::from_str(raw).map_err(|_| {
        ApiError::BadRequest(format!(
            "Unknown product status '{}'; expected ACTIVE or INACTIVE",
            raw
        ))
    })
}

/// Create a new product
async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let status = match payload.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => ProductStatus::Active,
    };

    let product = state
        .services
        .catalog
        .create_product(NewProduct {
            code: payload.code,
            name: payload.name,
            category_id: payload.category_id,
            stock_threshold: payload.stock_threshold,
            status,
        })
        .await
        .map_err(map_service_error)?;

    info!("Product created: {}", product.id);

    Ok(created_response(product))
}

/// Get a product by ID
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// List products with optional filters
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let products = state
        .services
        .catalog
        .list_products(ProductFilter {
            name_contains: query.name,
            category_id: query.category_id,
            status,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Update a product
async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let status = match payload.status.as_deref() {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let product = state
        .services
        .catalog
        .update_product(
            product_id,
            ProductUpdate {
                code: payload.code,
                name: payload.name,
                category_id: payload.category_id,
                stock_threshold: payload.stock_threshold,
                status,
            },
        )
        .await
        .map_err(map_service_error)?;

    info!("Product updated: {}", product_id);

    Ok(success_response(product))
}

/// Delete a product without inventory or purchase history
async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(product_id)
        .await
        .map_err(map_service_error)?;

    info!("Product deleted: {}", product_id);

    Ok(no_content_response())
}

/// Create a category
async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .catalog
        .create_category(&payload.name)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(category))
}

/// List categories
async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(categories))
}

/// Get a category by ID
async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .catalog
        .get_category(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

/// Rename a category
async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .catalog
        .update_category(category_id, &payload.name)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

/// Delete an empty category
async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_category(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Creates the router for product endpoints
pub fn product_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
}

/// Creates the router for category endpoints
pub fn category_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_category))
        .route("/", get(list_categories))
        .route("/:id", get(get_category))
        .route("/:id", put(update_category))
        .route("/:id", delete(delete_category))
}
