use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    entities::{
        alert_log::{AlertPriority, AlertType},
        alert_state::AlertStatus,
    },
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertLogQuery {
    pub alert_type: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAlertRequest {
    /// STOCK_LOW, NEAR_EXPIRY, EXPIRED or PURCHASE_RECORDED.
    pub alert_type: String,
    /// LOW, MEDIUM, HIGH or CRITICAL; defaults to the type's priority.
    pub priority: Option<String>,
    #[validate(length(min = 1))]
    pub message: String,
    pub detail: Option<serde_json::Value>,
    pub product_id: Option<i64>,
    pub batch_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AlertActionRequest {
    pub user_id: Option<i64>,
    pub notes: Option<String>,
}

fn parse_alert_type(raw: &str) -> Result<AlertType, ApiError> {
    AlertType::from_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Unknown alert type '{}'", raw)))
}

/// Live stock-low projection
async fn stock_low(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .alerts
        .stock_low_products()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(rows))
}

/// Live near-expiry projection
async fn near_expiry(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .alerts
        .near_expiry_batches(Utc::now().date_naive())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(rows))
}

/// Live expired projection
async fn expired(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .alerts
        .expired_batches(Utc::now().date_naive())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(rows))
}

/// Run a detection scan as of today
async fn scan(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .alerts
        .scan(Utc::now().date_naive())
        .await
        .map_err(map_service_error)?;

    info!(
        "Alert scan: {} created, {} reopened",
        summary.created, summary.reopened
    );

    Ok(success_response(summary))
}

/// List alert states, severity first
async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(AlertStatus::from_str(raw).map_err(|_| {
            ApiError::BadRequest(format!(
                "Unknown alert status '{}'; expected PENDING, VIEWED or RESOLVED",
                raw
            ))
        })?),
        None => None,
    };

    let states = state
        .services
        .alerts
        .list_states(status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(states))
}

/// Append-only alert history, newest first
async fn alert_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertLogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let alert_type = match query.alert_type.as_deref() {
        Some(raw) => Some(parse_alert_type(raw)?),
        None => None,
    };

    let rows = state
        .services
        .alerts
        .list_log(alert_type, query.limit.unwrap_or(100))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(rows))
}

/// Create a manual alert
async fn create_alert(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAlertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let alert_type = parse_alert_type(&payload.alert_type)?;
    let priority = match payload.priority.as_deref() {
        Some(raw) => Some(AlertPriority::from_str(raw).map_err(|_| {
            ApiError::BadRequest(format!("Unknown alert priority '{}'", raw))
        })?),
        None => None,
    };

    let alert = state
        .services
        .alerts
        .create_manual_alert(
            alert_type,
            priority,
            &payload.message,
            payload.detail.unwrap_or(serde_json::Value::Null),
            payload.product_id,
            payload.batch_id,
        )
        .await
        .map_err(map_service_error)?;

    info!("Manual alert created: {}", alert.id);

    Ok(created_response(alert))
}

/// Mark an alert viewed
async fn view_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<i64>,
    Json(payload): Json<AlertActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state
        .services
        .alerts
        .view_alert(alert_id, payload.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(alert))
}

/// Resolve an alert
async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<i64>,
    Json(payload): Json<AlertActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state
        .services
        .alerts
        .resolve_alert(alert_id, payload.user_id, payload.notes)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(alert))
}

/// Creates the router for alert endpoints
pub fn alert_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_alerts))
        .route("/", post(create_alert))
        .route("/stock-low", get(stock_low))
        .route("/near-expiry", get(near_expiry))
        .route("/expired", get(expired))
        .route("/scan", post(scan))
        .route("/log", get(alert_log))
        .route("/:id/view", post(view_alert))
        .route("/:id/resolve", post(resolve_alert))
}
