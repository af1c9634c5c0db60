pub mod alerts;
pub mod batches;
pub mod common;
pub mod products;
pub mod purchases;
pub mod queries;
pub mod suppliers;
pub mod users;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub stock_ledger: Arc<crate::services::stock_ledger::StockLedgerService>,
    pub purchases: Arc<crate::services::purchases::PurchaseService>,
    pub adjustments: Arc<crate::services::adjustments::AdjustmentService>,
    pub alerts: Arc<crate::services::alerts::AlertService>,
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub suppliers: Arc<crate::services::suppliers::SupplierService>,
    pub users: Arc<crate::services::users::UserService>,
    pub query_catalog: Arc<crate::services::query_catalog::QueryCatalogService>,
}

impl AppServices {
    /// Builds the service container. Fails fast if the query catalog file
    /// cannot be loaded.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let tx_timeout = config.tx_timeout();

        Ok(Self {
            stock_ledger: Arc::new(crate::services::stock_ledger::StockLedgerService::new(
                db_pool.clone(),
            )),
            purchases: Arc::new(crate::services::purchases::PurchaseService::new(
                db_pool.clone(),
                event_sender.clone(),
                tx_timeout,
            )),
            adjustments: Arc::new(crate::services::adjustments::AdjustmentService::new(
                db_pool.clone(),
                event_sender.clone(),
                tx_timeout,
            )),
            alerts: Arc::new(crate::services::alerts::AlertService::new(
                db_pool.clone(),
                config.expiry_alert_window_days,
            )),
            catalog: Arc::new(crate::services::catalog::CatalogService::new(
                db_pool.clone(),
            )),
            suppliers: Arc::new(crate::services::suppliers::SupplierService::new(
                db_pool.clone(),
            )),
            users: Arc::new(crate::services::users::UserService::new(db_pool.clone())),
            query_catalog: Arc::new(crate::services::query_catalog::QueryCatalogService::load(
                db_pool,
                &config.query_catalog_path,
            )?),
        })
    }
}
