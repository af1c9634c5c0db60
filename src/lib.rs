//! FarmaLink pharmacy-inventory backend.
//!
//! Tracks the product catalog, suppliers, purchases and the per-batch stock
//! ledger, and raises stock-low / near-expiry / expired alerts over it.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

// App state shared by every HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

/// Full v1 API surface, nested under `/api/v1` by the binary.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/products", handlers::products::product_routes())
        .nest("/categories", handlers::products::category_routes())
        .nest("/suppliers", handlers::suppliers::supplier_routes())
        .nest("/users", handlers::users::user_routes())
        .nest("/purchases", handlers::purchases::purchase_routes())
        .nest("/batches", handlers::batches::batch_routes())
        .nest("/alerts", handlers::alerts::alert_routes())
        .nest("/queries", handlers::queries::query_routes())
}

async fn api_status() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    Json(json!({
        "status": "ok",
        "service": "farmalink-api",
        "version": version,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
