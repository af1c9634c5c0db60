mod common;

use common::{date, line, seed_category, seed_product, seed_supplier, TestApp};
use farmalink_api::{
    entities::product::ProductStatus,
    errors::ServiceError,
    services::catalog::{NewProduct, ProductFilter, ProductUpdate},
    services::suppliers::NewSupplier,
};

#[tokio::test]
async fn duplicate_category_and_product_code_are_rejected() {
    let app = TestApp::new().await;

    app.catalog.create_category("Analgesics").await.unwrap();
    let dup = app.catalog.create_category("Analgesics").await;
    assert!(matches!(dup, Err(ServiceError::Validation(_))));

    let cat = app.catalog.create_category("Antibiotics").await.unwrap();
    app.catalog
        .create_product(NewProduct {
            code: Some("AMX-500".to_string()),
            name: "Amoxicillin 500mg".to_string(),
            category_id: cat.id,
            stock_threshold: 10,
            status: ProductStatus::Active,
        })
        .await
        .unwrap();

    let dup_code = app
        .catalog
        .create_product(NewProduct {
            code: Some("AMX-500".to_string()),
            name: "Amoxicillin 500mg (generic)".to_string(),
            category_id: cat.id,
            stock_threshold: 10,
            status: ProductStatus::Active,
        })
        .await;
    assert!(matches!(dup_code, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;

    let refused = app.catalog.delete_category(cat.id).await;
    assert!(matches!(refused, Err(ServiceError::InvalidOperation(_))));

    let empty = seed_category(&app, "Vitamins").await;
    app.catalog.delete_category(empty.id).await.unwrap();
}

#[tokio::test]
async fn product_with_history_cannot_be_deleted() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    app.purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![line(product.id, 5, "1.10", date(2025, 1, 31))],
        )
        .await
        .unwrap();

    // Below threshold while active, so the projection sees it.
    assert_eq!(app.alerts.stock_low_products().await.unwrap().len(), 1);

    let refused = app.catalog.delete_product(product.id).await;
    assert!(matches!(refused, Err(ServiceError::InvalidOperation(_))));

    // Deactivating is the supported path for products with history.
    let updated = app
        .catalog
        .update_product(
            product.id,
            ProductUpdate {
                status: Some(ProductStatus::Inactive),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, ProductStatus::Inactive.to_string());

    // Inactive products drop out of the stock-low projection.
    let stock_low = app.alerts.stock_low_products().await.unwrap();
    assert!(stock_low.is_empty());
}

#[tokio::test]
async fn product_list_filters_compose() {
    let app = TestApp::new().await;
    let analgesics = seed_category(&app, "Analgesics").await;
    let antibiotics = seed_category(&app, "Antibiotics").await;
    seed_product(&app, analgesics.id, "Paracetamol 500mg", 10).await;
    seed_product(&app, analgesics.id, "Ibuprofen 400mg", 10).await;
    seed_product(&app, antibiotics.id, "Amoxicillin 500mg", 10).await;

    let by_name = app
        .catalog
        .list_products(ProductFilter {
            name_contains: Some("500".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 2);

    let by_both = app
        .catalog
        .list_products(ProductFilter {
            name_contains: Some("500".to_string()),
            category_id: Some(analgesics.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_both.len(), 1);
    assert_eq!(by_both[0].name, "Paracetamol 500mg");
}

#[tokio::test]
async fn supplier_with_purchases_cannot_be_deleted() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;

    let supplier = app
        .suppliers
        .create_supplier(NewSupplier {
            legal_name: "Droguería Central".to_string(),
            contact_name: Some("Ana Ruiz".to_string()),
            phone: None,
            email: Some("compras@drogueriacentral.example".to_string()),
        })
        .await
        .unwrap();

    app.purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            None,
            vec![line(product.id, 10, "1.10", date(2025, 1, 31))],
        )
        .await
        .unwrap();

    let refused = app.suppliers.delete_supplier(supplier.id).await;
    assert!(matches!(refused, Err(ServiceError::InvalidOperation(_))));

    let unused = app
        .suppliers
        .create_supplier(NewSupplier {
            legal_name: "Laboratorios Sur".to_string(),
            contact_name: None,
            phone: None,
            email: None,
        })
        .await
        .unwrap();
    app.suppliers.delete_supplier(unused.id).await.unwrap();
}
