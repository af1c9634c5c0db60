use super::common::{map_service_error, success_response, validate_input};
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct BatchListQuery {
    pub product_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustBatchRequest {
    /// Signed stock delta; negative removes units.
    pub delta: i32,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
    pub user_id: Option<i64>,
}

/// List batches ordered by expiration date
async fn list_batches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BatchListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let batches = state
        .services
        .stock_ledger
        .list_batches(query.product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(batches))
}

/// Get a batch by ID
async fn get_batch(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = state
        .services
        .stock_ledger
        .get_batch(batch_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(batch))
}

/// Apply a signed stock adjustment to a batch
async fn adjust_batch(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<i64>,
    Json(payload): Json<AdjustBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let result = state
        .services
        .adjustments
        .adjust_batch(batch_id, payload.delta, &payload.reason, payload.user_id)
        .await
        .map_err(map_service_error)?;

    info!(
        "Batch {} adjusted by {} to {}",
        batch_id, payload.delta, result.batch.stock_quantity
    );

    Ok(success_response(serde_json::json!({
        "batch": result.batch,
        "adjustment": result.adjustment,
    })))
}

/// Adjustment history for a batch, newest first
async fn list_adjustments(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let adjustments = state
        .services
        .adjustments
        .list_adjustments(batch_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(adjustments))
}

/// Creates the router for batch endpoints
pub fn batch_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_batches))
        .route("/:id", get(get_batch))
        .route("/:id/adjustments", post(adjust_batch))
        .route("/:id/adjustments", get(list_adjustments))
}
