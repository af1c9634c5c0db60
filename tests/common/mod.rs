use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use farmalink_api::{
    db::{self, DbPool},
    entities::{app_user, category, product, supplier},
    events::{self, EventReceiver, EventSender},
    services::{
        adjustments::AdjustmentService,
        alerts::AlertService,
        catalog::CatalogService,
        purchases::{PurchaseLineInput, PurchaseService},
        stock_ledger::StockLedgerService,
        suppliers::SupplierService,
        users::UserService,
    },
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};

/// Test harness backed by an in-memory SQLite database. A single pooled
/// connection keeps the database alive for the life of the harness.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub stock_ledger: Arc<StockLedgerService>,
    pub purchases: Arc<PurchaseService>,
    pub adjustments: Arc<AdjustmentService>,
    pub alerts: Arc<AlertService>,
    pub catalog: Arc<CatalogService>,
    pub suppliers: Arc<SupplierService>,
    pub users: Arc<UserService>,
    pub event_sender: Arc<EventSender>,
    #[allow(dead_code)]
    pub event_rx: EventReceiver,
}

pub const EXPIRY_WINDOW_DAYS: i64 = 30;

impl TestApp {
    pub async fn new() -> Self {
        let cfg = db::DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };

        let pool = db::establish_connection_with_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let (sender, event_rx) = events::channel(64);
        let event_sender = Arc::new(sender);
        let tx_timeout = Duration::from_secs(5);

        Self {
            stock_ledger: Arc::new(StockLedgerService::new(db.clone())),
            purchases: Arc::new(PurchaseService::new(
                db.clone(),
                event_sender.clone(),
                tx_timeout,
            )),
            adjustments: Arc::new(AdjustmentService::new(
                db.clone(),
                event_sender.clone(),
                tx_timeout,
            )),
            alerts: Arc::new(AlertService::new(db.clone(), EXPIRY_WINDOW_DAYS)),
            catalog: Arc::new(CatalogService::new(db.clone())),
            suppliers: Arc::new(SupplierService::new(db.clone())),
            users: Arc::new(UserService::new(db.clone())),
            event_sender,
            event_rx,
            db,
        }
    }
}

pub async fn seed_category(app: &TestApp, name: &str) -> category::Model {
    category::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(app.db.as_ref())
    .await
    .expect("failed to seed category")
}

pub async fn seed_product(
    app: &TestApp,
    category_id: i64,
    name: &str,
    stock_threshold: i32,
) -> product::Model {
    product::ActiveModel {
        name: Set(name.to_string()),
        category_id: Set(category_id),
        stock_threshold: Set(stock_threshold),
        status: Set("ACTIVE".to_string()),
        ..Default::default()
    }
    .insert(app.db.as_ref())
    .await
    .expect("failed to seed product")
}

pub async fn seed_supplier(app: &TestApp, legal_name: &str) -> supplier::Model {
    supplier::ActiveModel {
        legal_name: Set(legal_name.to_string()),
        ..Default::default()
    }
    .insert(app.db.as_ref())
    .await
    .expect("failed to seed supplier")
}

#[allow(dead_code)]
pub async fn seed_user(app: &TestApp, name: &str) -> app_user::Model {
    app_user::ActiveModel {
        name: Set(name.to_string()),
        role: Set("CLERK".to_string()),
        ..Default::default()
    }
    .insert(app.db.as_ref())
    .await
    .expect("failed to seed user")
}

pub fn line(product_id: i64, quantity: i32, unit_cost: &str, expiration: NaiveDate) -> PurchaseLineInput {
    PurchaseLineInput {
        product_id,
        quantity,
        unit_cost: unit_cost.parse::<Decimal>().expect("bad decimal literal"),
        expiration_date: expiration,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("bad test date")
}
