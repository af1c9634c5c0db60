mod common;

use common::{date, line, seed_category, seed_product, seed_supplier, TestApp};
use farmalink_api::{
    entities::{
        alert_log::AlertType,
        alert_state::{self, AlertStatus, Entity as AlertState},
    },
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

/// Seeds one product (threshold 10) with a single 5-unit batch expiring
/// 10 days after the returned scan date.
async fn seed_low_and_near_expiry(app: &TestApp) -> (i64, i64, chrono::NaiveDate) {
    let today = date(2024, 6, 1);
    let cat = seed_category(app, "Analgesics").await;
    let product = seed_product(app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(app, "Droguería Central").await;

    let recorded = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 5, 1),
            None,
            vec![line(product.id, 5, "1.10", date(2024, 6, 11))],
        )
        .await
        .expect("seed purchase should commit");

    (product.id, recorded.batches[0].id, today)
}

#[tokio::test]
async fn low_stock_near_expiry_batch_raises_both_alerts() {
    let app = TestApp::new().await;
    let (product_id, batch_id, today) = seed_low_and_near_expiry(&app).await;

    let stock_low = app.alerts.stock_low_products().await.unwrap();
    assert_eq!(stock_low.len(), 1);
    assert_eq!(stock_low[0].product_id, product_id);
    assert_eq!(stock_low[0].total_stock, 5);

    let near_expiry = app.alerts.near_expiry_batches(today).await.unwrap();
    assert_eq!(near_expiry.len(), 1);
    assert_eq!(near_expiry[0].batch_id, batch_id);
    assert_eq!(near_expiry[0].days_until_expiry, 10);

    let summary = app.alerts.scan(today).await.unwrap();
    assert_eq!(summary.stock_low, 1);
    assert_eq!(summary.near_expiry, 1);
    assert_eq!(summary.expired, 0);
    assert_eq!(summary.created, 2);

    let states = app.alerts.list_states(None).await.unwrap();
    assert_eq!(states.len(), 2);
}

#[tokio::test]
async fn repeated_scans_refresh_instead_of_duplicating() {
    let app = TestApp::new().await;
    let (_, _, today) = seed_low_and_near_expiry(&app).await;

    let first = app.alerts.scan(today).await.unwrap();
    assert_eq!(first.created, 2);

    let second = app.alerts.scan(today).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.refreshed, 2);

    // One state and one log row per condition, not per scan.
    assert_eq!(app.alerts.list_states(None).await.unwrap().len(), 2);
    assert_eq!(app.alerts.list_log(None, 100).await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_scans_keep_one_state_per_condition() {
    let app = TestApp::new().await;
    let (_, _, today) = seed_low_and_near_expiry(&app).await;

    // Whichever scan loses the state-insert race must fall through to a
    // refresh, not surface a unique-index error.
    let (first, second) = tokio::join!(app.alerts.scan(today), app.alerts.scan(today));
    first.expect("first scan should succeed");
    second.expect("second scan should succeed");

    assert_eq!(app.alerts.list_states(None).await.unwrap().len(), 2);
    assert_eq!(app.alerts.list_log(None, 100).await.unwrap().len(), 2);
}

#[tokio::test]
async fn expired_projection_skips_empty_batches() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Ibuprofen 400mg", 2).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    let recorded = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 1, 10),
            None,
            vec![
                line(product.id, 8, "2.50", date(2024, 3, 1)),
                line(product.id, 6, "2.50", date(2024, 4, 1)),
            ],
        )
        .await
        .unwrap();

    // Drain the first expired batch entirely.
    let drained = recorded.batches[0].id;
    app.adjustments
        .adjust_batch(drained, -8, "Expired stock destroyed", None)
        .await
        .unwrap();

    let expired = app.alerts.expired_batches(date(2024, 6, 1)).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].batch_id, recorded.batches[1].id);
    assert_eq!(expired[0].stock_quantity, 6);
}

#[tokio::test]
async fn alert_lifecycle_enforces_transitions() {
    let app = TestApp::new().await;
    let (_, _, today) = seed_low_and_near_expiry(&app).await;
    app.alerts.scan(today).await.unwrap();

    let pending = app
        .alerts
        .list_states(Some(AlertStatus::Pending))
        .await
        .unwrap();
    let alert_id = pending[0].id;

    let viewed = app.alerts.view_alert(alert_id, Some(7)).await.unwrap();
    assert_eq!(viewed.status, AlertStatus::Viewed.to_string());
    assert_eq!(viewed.viewed_by, Some(7));

    // Viewing twice is a conflict.
    let again = app.alerts.view_alert(alert_id, Some(7)).await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));

    let resolved = app
        .alerts
        .resolve_alert(alert_id, Some(7), Some("Restocked".to_string()))
        .await
        .unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved.to_string());
    assert_eq!(resolved.resolution_notes.as_deref(), Some("Restocked"));

    let re_resolved = app.alerts.resolve_alert(alert_id, Some(7), None).await;
    assert!(matches!(re_resolved, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn resolved_alert_reopens_only_after_condition_clears() {
    let app = TestApp::new().await;
    let (product_id, batch_id, today) = seed_low_and_near_expiry(&app).await;
    app.alerts.scan(today).await.unwrap();

    let stock_low_state = AlertState::find()
        .filter(alert_state::Column::AlertType.eq(AlertType::StockLow.to_string()))
        .one(app.db.as_ref())
        .await
        .unwrap()
        .expect("stock-low state expected");

    app.alerts
        .resolve_alert(stock_low_state.id, Some(1), None)
        .await
        .unwrap();

    // Condition still holds; a resolved state stays resolved.
    let summary = app.alerts.scan(today).await.unwrap();
    assert_eq!(summary.reopened, 0);
    let state = app.alerts.get_state(stock_low_state.id).await.unwrap();
    assert_eq!(state.status, AlertStatus::Resolved.to_string());

    // Restock past the threshold so the condition clears.
    let batch = app.stock_ledger.get_batch(batch_id).await.unwrap();
    app.stock_ledger
        .set_batch_stock(batch_id, 50, batch.version)
        .await
        .unwrap();
    app.alerts.scan(today).await.unwrap();
    let state = app.alerts.get_state(stock_low_state.id).await.unwrap();
    assert!(state.condition_cleared);

    // Stock drops again: the resolved state reopens as pending.
    let batch = app.stock_ledger.get_batch(batch_id).await.unwrap();
    app.stock_ledger
        .set_batch_stock(batch_id, 3, batch.version)
        .await
        .unwrap();
    let summary = app.alerts.scan(today).await.unwrap();
    assert_eq!(summary.reopened, 1);

    let state = app.alerts.get_state(stock_low_state.id).await.unwrap();
    assert_eq!(state.status, AlertStatus::Pending.to_string());
    assert!(!state.condition_cleared);
    assert_eq!(state.scope_id, product_id);

    // The reopen appended to the log; state rows did not multiply.
    let stock_low_rows = app
        .alerts
        .list_log(Some(AlertType::StockLow), 100)
        .await
        .unwrap();
    assert_eq!(stock_low_rows.len(), 2);
    let states = AlertState::find()
        .filter(alert_state::Column::AlertType.eq(AlertType::StockLow.to_string()))
        .count(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(states, 1);
}

#[tokio::test]
async fn manual_alert_requires_an_anchor() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;

    let unanchored = app
        .alerts
        .create_manual_alert(
            AlertType::StockLow,
            None,
            "Check the shelf",
            serde_json::Value::Null,
            None,
            None,
        )
        .await;
    assert!(matches!(unanchored, Err(ServiceError::Validation(_))));

    let created = app
        .alerts
        .create_manual_alert(
            AlertType::StockLow,
            None,
            "Shelf count disagrees with system",
            serde_json::json!({ "counted": 3 }),
            Some(product.id),
            None,
        )
        .await
        .unwrap();
    assert_eq!(created.status, AlertStatus::Pending.to_string());
    assert_eq!(created.scope_id, product.id);

    let log = app.alerts.list_log(None, 100).await.unwrap();
    assert_eq!(log.len(), 1);
}
