mod common;

use common::{date, line, seed_category, seed_product, seed_supplier, seed_user, TestApp};
use farmalink_api::{
    entities::app_user::UserRole,
    errors::ServiceError,
    services::users::{NewUser, UserUpdate},
};

#[tokio::test]
async fn duplicate_user_name_is_rejected() {
    let app = TestApp::new().await;

    app.users
        .create_user(NewUser {
            name: "Ana Ruiz".to_string(),
            role: UserRole::Admin,
        })
        .await
        .unwrap();

    let dup = app
        .users
        .create_user(NewUser {
            name: "Ana Ruiz".to_string(),
            role: UserRole::Clerk,
        })
        .await;
    assert!(matches!(dup, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn user_update_changes_only_supplied_fields() {
    let app = TestApp::new().await;
    let user = app
        .users
        .create_user(NewUser {
            name: "M. Vargas".to_string(),
            role: UserRole::Clerk,
        })
        .await
        .unwrap();

    let updated = app
        .users
        .update_user(
            user.id,
            UserUpdate {
                role: Some(UserRole::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "M. Vargas");
    assert_eq!(updated.role, UserRole::Admin.to_string());

    let missing = app.users.update_user(424242, UserUpdate::default()).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn purchase_attributed_to_a_user_commits() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;
    let clerk = seed_user(&app, "M. Vargas").await;

    let recorded = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            Some(clerk.id),
            vec![line(product.id, 10, "1.10", date(2025, 1, 31))],
        )
        .await
        .unwrap();
    assert_eq!(recorded.purchase.registered_by, Some(clerk.id));
}

#[tokio::test]
async fn purchase_by_unknown_user_is_rejected() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;

    let result = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            Some(424242),
            vec![line(product.id, 10, "1.10", date(2025, 1, 31))],
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    assert!(app.purchases.list_purchases().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_user_nulls_their_purchase_references() {
    let app = TestApp::new().await;
    let cat = seed_category(&app, "Analgesics").await;
    let product = seed_product(&app, cat.id, "Paracetamol 500mg", 10).await;
    let supplier = seed_supplier(&app, "Droguería Central").await;
    let clerk = seed_user(&app, "M. Vargas").await;

    let recorded = app
        .purchases
        .record_purchase(
            supplier.id,
            date(2024, 3, 1),
            Some(clerk.id),
            vec![line(product.id, 10, "1.10", date(2025, 1, 31))],
        )
        .await
        .unwrap();

    app.users.delete_user(clerk.id).await.unwrap();

    let (header, _) = app
        .purchases
        .get_purchase(recorded.purchase.id)
        .await
        .unwrap();
    assert_eq!(header.registered_by, None);

    let missing = app.users.delete_user(clerk.id).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}
