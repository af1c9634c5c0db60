mod common;

use common::{date, line, seed_category, seed_product, seed_supplier, TestApp};
use farmalink_api::{
    entities::{
        batch::Entity as Batch,
        purchase::Entity as Purchase,
        purchase_line::Entity as PurchaseLine,
    },
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn purchase_total_is_sum_of_line_subtotals() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let ibuprofen = seed_product(&app, cat.id, "Ibuprofen 400mg", 10).await;
    let amoxicillin = seed_product(&app, cat.id, "Amoxicillin 500mg", 20).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    let recorded = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![
                line(ibuprofen.id, 30, "2.50", date(2025, 3, 1)),
                line(amoxicillin.id, 12, "7.25", date(2025, 6, 15)),
            ],
        )
        .await
        .expect("purchase should commit");

    // 30 * 2.50 + 12 * 7.25 = 75.00 + 87.00
    assert_eq!(recorded.purchase.total, "162.00".parse::<Decimal>().unwrap());
    assert_eq!(recorded.lines.len(), 2);
    assert_eq!(recorded.batches.len(), 2);
}

#[tokio::test]
async fn lines_for_same_product_and_expiration_merge_into_one_batch() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;
    let exp = date(2025, 1, 31);

    let recorded = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![
                line(product.id, 20, "1.10", exp),
                line(product.id, 15, "1.05", exp),
                line(product.id, 5, "1.10", date(2025, 8, 31)),
            ],
        )
        .await
        .expect("purchase should commit");

    // Three lines survive verbatim; the two sharing an expiration share a batch.
    assert_eq!(recorded.lines.len(), 3);
    assert_eq!(recorded.batches.len(), 2);

    let merged = recorded
        .batches
        .iter()
        .find(|b| b.expiration_date == exp)
        .expect("merged batch missing");
    assert_eq!(merged.stock_quantity, 35);
    assert_eq!(merged.version, 2);
}

#[tokio::test]
async fn zero_quantity_line_rejects_whole_purchase() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    let result = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![
                line(product.id, 10, "1.10", date(2025, 1, 31)),
                line(product.id, 0, "1.10", date(2025, 1, 31)),
            ],
        )
        .await;

    assert!(matches!(result, Err(ServiceError::Validation(_))));

    // Nothing landed.
    let db = app.db.as_ref();
    assert_eq!(Purchase::find().count(db).await.unwrap(), 0);
    assert_eq!(PurchaseLine::find().count(db).await.unwrap(), 0);
    assert_eq!(Batch::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_supplier_or_product_is_a_validation_error() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    let missing_supplier = app
        .purchases
        .record_purchase(
            9999,
            date(2024, 3, 1),
            None,
            vec![line(product.id, 10, "1.10", date(2025, 1, 31))],
        )
        .await;
    assert!(matches!(missing_supplier, Err(ServiceError::Validation(_))));

    let missing_product = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![line(9999, 10, "1.10", date(2025, 1, 31))],
        )
        .await;
    assert!(matches!(missing_product, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn delete_purchase_reports_exact_counts() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let other = seed_product(&app, cat.id, "Ibuprofen 400mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    let recorded = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![
                line(product.id, 10, "1.10", date(2025, 1, 31)),
                line(product.id, 10, "1.10", date(2025, 1, 31)),
                line(other.id, 4, "3.00", date(2025, 2, 28)),
            ],
        )
        .await
        .expect("purchase should commit");

    let deleted = app
        .purchases
        .delete_purchase(recorded.purchase.id)
        .await
        .expect("delete should succeed");

    assert_eq!(deleted.lines_deleted, 3);
    assert_eq!(deleted.batches_deleted, 2);

    let db = app.db.as_ref();
    assert_eq!(Purchase::find().count(db).await.unwrap(), 0);
    assert_eq!(Batch::find().count(db).await.unwrap(), 0);

    let gone = app.purchases.delete_purchase(recorded.purchase.id).await;
    assert!(matches!(gone, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn aggregate_stock_sums_batches_across_purchases() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    app.purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![line(product.id, 10, "1.10", date(2025, 1, 31))],
        )
        .await
        .unwrap();
    app.purchases
        .record_purchase(
            supplier.id,
            date(2024, 4, 1),
            None,
            vec![line(product.id, 25, "1.15", date(2025, 9, 30))],
        )
        .await
        .unwrap();

    assert_eq!(app.stock_ledger.aggregate_stock(product.id).await.unwrap(), 35);

    // A product with no batches aggregates to zero, not NULL.
    let bare = seed_product(&app, cat.id, "Omeprazole 20mg", 5).await;
    assert_eq!(app.stock_ledger.aggregate_stock(bare.id).await.unwrap(), 0);
}
