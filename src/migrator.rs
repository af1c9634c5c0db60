use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_purchase_tables::Migration),
            Box::new(m20240101_000003_create_batch_tables::Migration),
            Box::new(m20240101_000004_create_alert_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::Name)
                                .string_len(120)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Users::Name).string_len(120).not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(12)
                                .not_null()
                                .default("CLERK"),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::LegalName)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::ContactName).string_len(120).null())
                        .col(ColumnDef::new(Suppliers::Phone).string_len(40).null())
                        .col(ColumnDef::new(Suppliers::Email).string_len(160).null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::Code)
                                .string_len(50)
                                .null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Products::CategoryId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Products::StockThreshold)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Products::StockThreshold).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Products::Status)
                                .string_len(10)
                                .not_null()
                                .default("ACTIVE"),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Categories {
        Table,
        Id,
        Name,
    }

    #[derive(Iden)]
    pub enum Users {
        Table,
        Id,
        Name,
        Role,
    }

    #[derive(Iden)]
    pub enum Suppliers {
        Table,
        Id,
        LegalName,
        ContactName,
        Phone,
        Email,
    }

    #[derive(Iden)]
    pub enum Products {
        Table,
        Id,
        Code,
        Name,
        CategoryId,
        StockThreshold,
        Status,
    }
}

mod m20240101_000002_create_purchase_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240101_000001_create_catalog_tables::{Products, Suppliers, Users};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_purchase_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Purchases::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Purchases::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Purchases::SupplierId).big_integer().not_null())
                        .col(ColumnDef::new(Purchases::PurchaseDate).date().not_null())
                        .col(
                            ColumnDef::new(Purchases::Total)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0)
                                .check(Expr::col(Purchases::Total).gte(0)),
                        )
                        .col(ColumnDef::new(Purchases::RegisteredBy).big_integer().null())
                        .col(
                            ColumnDef::new(Purchases::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchases_supplier")
                                .from(Purchases::Table, Purchases::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchases_registered_by")
                                .from(Purchases::Table, Purchases::RegisteredBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseLines::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseLines::PurchaseId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseLines::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseLines::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(PurchaseLines::Quantity).gt(0)),
                        )
                        .col(
                            ColumnDef::new(PurchaseLines::UnitCost)
                                .decimal_len(12, 2)
                                .not_null()
                                .check(Expr::col(PurchaseLines::UnitCost).gte(0)),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_lines_purchase")
                                .from(PurchaseLines::Table, PurchaseLines::PurchaseId)
                                .to(Purchases::Table, Purchases::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_lines_product")
                                .from(PurchaseLines::Table, PurchaseLines::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_lines_purchase_id")
                        .table(PurchaseLines::Table)
                        .col(PurchaseLines::PurchaseId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Purchases::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Purchases {
        Table,
        Id,
        SupplierId,
        PurchaseDate,
        Total,
        RegisteredBy,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum PurchaseLines {
        Table,
        Id,
        PurchaseId,
        ProductId,
        Quantity,
        UnitCost,
    }
}

mod m20240101_000003_create_batch_tables {
    use sea_orm_migration::prelude::*;

    use super::m20240101_000001_create_catalog_tables::{Products, Users};
    use super::m20240101_000002_create_purchase_tables::Purchases;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_batch_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Batches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Batches::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Batches::ProductId).big_integer().not_null())
                        .col(ColumnDef::new(Batches::PurchaseId).big_integer().not_null())
                        .col(ColumnDef::new(Batches::ExpirationDate).date().not_null())
                        .col(
                            ColumnDef::new(Batches::StockQuantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(Batches::StockQuantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Batches::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Batches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Batches::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batches_product")
                                .from(Batches::Table, Batches::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batches_purchase")
                                .from(Batches::Table, Batches::PurchaseId)
                                .to(Purchases::Table, Purchases::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            // Repeated product+expiration within one purchase must merge,
            // never duplicate.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_batches_product_purchase_expiration")
                        .table(Batches::Table)
                        .col(Batches::ProductId)
                        .col(Batches::PurchaseId)
                        .col(Batches::ExpirationDate)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batches_expiration_date")
                        .table(Batches::Table)
                        .col(Batches::ExpirationDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BatchAdjustments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BatchAdjustments::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BatchAdjustments::BatchId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BatchAdjustments::Delta).integer().not_null())
                        .col(
                            ColumnDef::new(BatchAdjustments::Reason)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(ColumnDef::new(BatchAdjustments::UserId).big_integer().null())
                        .col(
                            ColumnDef::new(BatchAdjustments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batch_adjustments_batch")
                                .from(BatchAdjustments::Table, BatchAdjustments::BatchId)
                                .to(Batches::Table, Batches::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_batch_adjustments_user")
                                .from(BatchAdjustments::Table, BatchAdjustments::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_adjustments_batch_id")
                        .table(BatchAdjustments::Table)
                        .col(BatchAdjustments::BatchId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BatchAdjustments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Batches::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Batches {
        Table,
        Id,
        ProductId,
        PurchaseId,
        ExpirationDate,
        StockQuantity,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum BatchAdjustments {
        Table,
        Id,
        BatchId,
        Delta,
        Reason,
        UserId,
        CreatedAt,
    }
}

mod m20240101_000004_create_alert_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_alert_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AlertStates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AlertStates::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertStates::ScopeType)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AlertStates::ScopeId).big_integer().not_null())
                        .col(
                            ColumnDef::new(AlertStates::AlertType)
                                .string_len(30)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertStates::Status)
                                .string_len(10)
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(
                            ColumnDef::new(AlertStates::Priority)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AlertStates::Message).text().not_null())
                        .col(ColumnDef::new(AlertStates::Detail).json().not_null())
                        .col(
                            ColumnDef::new(AlertStates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertStates::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertStates::LastSeenAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AlertStates::ViewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(AlertStates::ViewedBy).big_integer().null())
                        .col(
                            ColumnDef::new(AlertStates::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(AlertStates::ResolvedBy).big_integer().null())
                        .col(ColumnDef::new(AlertStates::ResolutionNotes).text().null())
                        .col(
                            ColumnDef::new(AlertStates::ConditionCleared)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_alert_states_scope_type")
                        .table(AlertStates::Table)
                        .col(AlertStates::ScopeType)
                        .col(AlertStates::ScopeId)
                        .col(AlertStates::AlertType)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AlertLog::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AlertLog::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AlertLog::AlertType).string_len(30).not_null())
                        .col(ColumnDef::new(AlertLog::Priority).string_len(10).not_null())
                        .col(ColumnDef::new(AlertLog::Message).text().not_null())
                        .col(ColumnDef::new(AlertLog::Detail).json().not_null())
                        .col(ColumnDef::new(AlertLog::ProductId).big_integer().null())
                        .col(ColumnDef::new(AlertLog::BatchId).big_integer().null())
                        .col(
                            ColumnDef::new(AlertLog::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_alert_log_type_created_at")
                        .table(AlertLog::Table)
                        .col(AlertLog::AlertType)
                        .col(AlertLog::CreatedAt)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AlertLog::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AlertStates::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum AlertStates {
        Table,
        Id,
        ScopeType,
        ScopeId,
        AlertType,
        Status,
        Priority,
        Message,
        Detail,
        CreatedAt,
        UpdatedAt,
        LastSeenAt,
        ViewedAt,
        ViewedBy,
        ResolvedAt,
        ResolvedBy,
        ResolutionNotes,
        ConditionCleared,
    }

    #[derive(Iden)]
    pub enum AlertLog {
        Table,
        Id,
        AlertType,
        Priority,
        Message,
        Detail,
        ProductId,
        BatchId,
        CreatedAt,
    }
}
