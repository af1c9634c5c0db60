use crate::{
    db::{self, DbPool},
    entities::{
        app_user::Entity as AppUser,
        batch::{self, Entity as Batch},
        product::{self, Entity as Product},
        purchase::{self, Entity as Purchase},
        purchase_line::{self, Entity as PurchaseLine},
        supplier::Entity as Supplier,
    },
    errors::ServiceError,
    events::{Event, EventSender, PurchaseLineDetail, PurchaseRecordedEvent},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// One requested purchase line.
#[derive(Debug, Clone)]
pub struct PurchaseLineInput {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub expiration_date: NaiveDate,
}

/// A committed purchase with everything the transaction created.
#[derive(Debug, Clone)]
pub struct RecordedPurchase {
    pub purchase: purchase::Model,
    pub lines: Vec<purchase_line::Model>,
    pub batches: Vec<batch::Model>,
}

/// Counts removed by `delete_purchase`.
#[derive(Debug, Clone, Copy)]
pub struct DeletedPurchase {
    pub purchase_id: i64,
    pub lines_deleted: u64,
    pub batches_deleted: u64,
}

/// Records purchases atomically: header, lines, and the receiving batches
/// land in one transaction or not at all. Notification work happens after
/// commit through the event channel.
pub struct PurchaseService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    tx_timeout: Duration,
}

impl PurchaseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, tx_timeout: Duration) -> Self {
        Self {
            db_pool,
            event_sender,
            tx_timeout,
        }
    }

    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn record_purchase(
        &self,
        supplier_id: i64,
        purchase_date: NaiveDate,
        registered_by: Option<i64>,
        lines: Vec<PurchaseLineInput>,
    ) -> Result<RecordedPurchase, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::Validation(
                "A purchase requires at least one line".to_string(),
            ));
        }
        for (idx, line) in lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(ServiceError::Validation(format!(
                    "Line {}: quantity must be greater than zero",
                    idx + 1
                )));
            }
            if line.unit_cost < Decimal::ZERO {
                return Err(ServiceError::Validation(format!(
                    "Line {}: unit cost must not be negative",
                    idx + 1
                )));
            }
        }

        let db = self.db_pool.as_ref();

        let supplier = Supplier::find_by_id(supplier_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::Validation(format!("Supplier {} does not exist", supplier_id))
            })?;

        if let Some(user_id) = registered_by {
            AppUser::find_by_id(user_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::Validation(format!("User {} does not exist", user_id))
                })?;
        }

        let product_names = self.resolve_products(&lines).await?;

        let db = self.db_pool.clone();
        let tx_lines = lines.clone();
        let recorded = db::with_tx_timeout(self.tx_timeout, async move {
            db.transaction::<_, RecordedPurchase, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = purchase::ActiveModel {
                        supplier_id: Set(supplier_id),
                        purchase_date: Set(purchase_date),
                        total: Set(Decimal::ZERO),
                        registered_by: Set(registered_by),
                        created_at: Set(Utc::now()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let mut total = Decimal::ZERO;
                    let mut inserted_lines = Vec::with_capacity(tx_lines.len());
                    // Batches merge on (product, expiration) within this purchase.
                    let mut batch_ids: HashMap<(i64, NaiveDate), i64> = HashMap::new();

                    for line in &tx_lines {
                        let inserted = purchase_line::ActiveModel {
                            purchase_id: Set(header.id),
                            product_id: Set(line.product_id),
                            quantity: Set(line.quantity),
                            unit_cost: Set(line.unit_cost),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                        inserted_lines.push(inserted);

                        let key = (line.product_id, line.expiration_date);
                        match batch_ids.get(&key) {
                            Some(&batch_id) => {
                                Batch::update_many()
                                    .col_expr(
                                        batch::Column::StockQuantity,
                                        Expr::col(batch::Column::StockQuantity)
                                            .add(line.quantity),
                                    )
                                    .col_expr(
                                        batch::Column::Version,
                                        Expr::col(batch::Column::Version).add(1),
                                    )
                                    .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()))
                                    .filter(batch::Column::Id.eq(batch_id))
                                    .exec(txn)
                                    .await
                                    .map_err(ServiceError::db_error)?;
                            }
                            None => {
                                let now = Utc::now();
                                let created = batch::ActiveModel {
                                    product_id: Set(line.product_id),
                                    purchase_id: Set(header.id),
                                    expiration_date: Set(line.expiration_date),
                                    stock_quantity: Set(line.quantity),
                                    version: Set(1),
                                    created_at: Set(now),
                                    updated_at: Set(now),
                                    ..Default::default()
                                }
                                .insert(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                                batch_ids.insert(key, created.id);
                            }
                        }

                        total += Decimal::from(line.quantity) * line.unit_cost;
                    }

                    let mut header_update: purchase::ActiveModel = header.into();
                    header_update.total = Set(total);
                    let header = header_update
                        .update(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let batches = Batch::find()
                        .filter(batch::Column::PurchaseId.eq(header.id))
                        .order_by_asc(batch::Column::ExpirationDate)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    Ok(RecordedPurchase {
                        purchase: header,
                        lines: inserted_lines,
                        batches,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
        })
        .await?;

        info!(
            purchase_id = recorded.purchase.id,
            supplier_id,
            total = %recorded.purchase.total,
            "Purchase recorded"
        );

        let event_lines = lines
            .iter()
            .map(|line| PurchaseLineDetail {
                product_id: line.product_id,
                product_name: product_names
                    .get(&line.product_id)
                    .cloned()
                    .unwrap_or_default(),
                quantity: line.quantity,
                unit_cost: line.unit_cost,
                subtotal: Decimal::from(line.quantity) * line.unit_cost,
                expiration_date: line.expiration_date,
            })
            .collect();

        let _ = self
            .event_sender
            .send(Event::PurchaseRecorded(PurchaseRecordedEvent {
                purchase_id: recorded.purchase.id,
                supplier_id,
                supplier_name: supplier.legal_name,
                purchase_date,
                total: recorded.purchase.total,
                registered_by,
                lines: event_lines,
            }))
            .await;

        Ok(recorded)
    }

    /// Hard delete of a purchase and everything it created. Consumed stock
    /// is not reconciled; callers accept that batches vanish with their
    /// remaining quantity.
    #[instrument(skip(self))]
    pub async fn delete_purchase(&self, purchase_id: i64) -> Result<DeletedPurchase, ServiceError> {
        let db = self.db_pool.clone();

        let deleted = db::with_tx_timeout(self.tx_timeout, async move {
            db.transaction::<_, DeletedPurchase, ServiceError>(move |txn| {
                Box::pin(async move {
                    Purchase::find_by_id(purchase_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Purchase {} not found", purchase_id))
                        })?;

                    let batches_deleted = Batch::delete_many()
                        .filter(batch::Column::PurchaseId.eq(purchase_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .rows_affected;

                    let lines_deleted = PurchaseLine::delete_many()
                        .filter(purchase_line::Column::PurchaseId.eq(purchase_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .rows_affected;

                    Purchase::delete_by_id(purchase_id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    Ok(DeletedPurchase {
                        purchase_id,
                        lines_deleted,
                        batches_deleted,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
        })
        .await?;

        info!(
            purchase_id,
            lines_deleted = deleted.lines_deleted,
            batches_deleted = deleted.batches_deleted,
            "Purchase deleted"
        );

        let _ = self
            .event_sender
            .send(Event::PurchaseDeleted {
                purchase_id,
                lines_deleted: deleted.lines_deleted,
                batches_deleted: deleted.batches_deleted,
            })
            .await;

        Ok(deleted)
    }

    #[instrument(skip(self))]
    pub async fn get_purchase(
        &self,
        purchase_id: i64,
    ) -> Result<(purchase::Model, Vec<purchase_line::Model>), ServiceError> {
        let db = self.db_pool.as_ref();

        let header = Purchase::find_by_id(purchase_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase {} not found", purchase_id))
            })?;

        let lines = PurchaseLine::find()
            .filter(purchase_line::Column::PurchaseId.eq(purchase_id))
            .order_by_asc(purchase_line::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((header, lines))
    }

    /// Purchases newest first.
    #[instrument(skip(self))]
    pub async fn list_purchases(&self) -> Result<Vec<purchase::Model>, ServiceError> {
        Purchase::find()
            .order_by_desc(purchase::Column::PurchaseDate)
            .order_by_desc(purchase::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Ensures every referenced product exists; returns id -> name.
    async fn resolve_products(
        &self,
        lines: &[PurchaseLineInput],
    ) -> Result<HashMap<i64, String>, ServiceError> {
        let mut ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let products = Product::find()
            .filter(product::Column::Id.is_in(ids.clone()))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let found: HashMap<i64, String> =
            products.into_iter().map(|p| (p.id, p.name)).collect();

        for id in &ids {
            if !found.contains_key(id) {
                return Err(ServiceError::Validation(format!(
                    "Product {} does not exist",
                    id
                )));
            }
        }

        Ok(found)
    }
}
