use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunQueryRequest {
    pub key: String,
    /// Positional values for the query's declared parameters.
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
}

/// List catalog queries
async fn list_queries(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.query_catalog.list().await))
}

/// Run a catalog query with positional parameters
async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunQueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .query_catalog
        .run(&payload.key, payload.params)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(rows))
}

/// Reload the catalog file
async fn reload_queries(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .query_catalog
        .reload()
        .await
        .map_err(map_service_error)?;

    info!("Query catalog reloaded with {} entries", entries);

    Ok(success_response(serde_json::json!({ "entries": entries })))
}

/// Creates the router for query catalog endpoints
pub fn query_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_queries))
        .route("/run", post(run_query))
        .route("/reload", post(reload_queries))
}
