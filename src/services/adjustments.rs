use crate::{
    db::{self, DbPool},
    entities::{
        app_user::Entity as AppUser,
        batch::{self, Entity as Batch},
        batch_adjustment::{self, Entity as BatchAdjustment},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Outcome of a committed adjustment.
#[derive(Debug, Clone)]
pub struct AdjustmentResult {
    pub batch: batch::Model,
    pub adjustment: batch_adjustment::Model,
}

/// Applies signed stock deltas to batches. The audit row and the stock
/// update commit in the same transaction; the update itself is an
/// optimistic compare-and-swap on (id, version).
pub struct AdjustmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    tx_timeout: Duration,
}

impl AdjustmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, tx_timeout: Duration) -> Self {
        Self {
            db_pool,
            event_sender,
            tx_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn adjust_batch(
        &self,
        batch_id: i64,
        delta: i32,
        reason: &str,
        user_id: Option<i64>,
    ) -> Result<AdjustmentResult, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::Validation(
                "Adjustment reason must not be empty".to_string(),
            ));
        }

        if let Some(user_id) = user_id {
            AppUser::find_by_id(user_id)
                .one(self.db_pool.as_ref())
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::Validation(format!("User {} does not exist", user_id))
                })?;
        }

        let db = self.db_pool.clone();
        let reason_owned = reason.to_string();

        let result = db::with_tx_timeout(self.tx_timeout, async move {
            db.transaction::<_, AdjustmentResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    let current = Batch::find_by_id(batch_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Batch {} not found", batch_id))
                        })?;

                    let new_quantity =
                        current.stock_quantity.checked_add(delta).ok_or_else(|| {
                            ServiceError::Validation(format!(
                                "Adjustment of {} to batch {} overflows the stock range",
                                delta, batch_id
                            ))
                        })?;
                    if new_quantity < 0 {
                        return Err(ServiceError::NegativeStock(format!(
                            "Adjustment of {} would drive batch {} from {} below zero",
                            delta, batch_id, current.stock_quantity
                        )));
                    }

                    let update = Batch::update_many()
                        .col_expr(batch::Column::StockQuantity, Expr::value(new_quantity))
                        .col_expr(
                            batch::Column::Version,
                            Expr::col(batch::Column::Version).add(1),
                        )
                        .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(batch::Column::Id.eq(batch_id))
                        .filter(batch::Column::Version.eq(current.version))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if update.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Batch {} was modified concurrently; retry with fresh data",
                            batch_id
                        )));
                    }

                    let adjustment = batch_adjustment::ActiveModel {
                        batch_id: Set(batch_id),
                        delta: Set(delta),
                        reason: Set(reason_owned),
                        user_id: Set(user_id),
                        created_at: Set(Utc::now()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let updated = Batch::find_by_id(batch_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::Internal(format!(
                                "Batch {} disappeared mid-transaction",
                                batch_id
                            ))
                        })?;

                    Ok(AdjustmentResult {
                        batch: updated,
                        adjustment,
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
            batch_id,
            delta,
            new_quantity = result.batch.stock_quantity,
            "Batch adjusted"
        );

        // Post-commit; a full channel only costs us the audit event.
        let _ = self
            .event_sender
            .send(Event::BatchAdjusted {
                batch_id,
                product_id: result.batch.product_id,
                delta,
                new_quantity: result.batch.stock_quantity,
                reason: result.adjustment.reason.clone(),
                user_id,
            })
            .await;

        Ok(result)
    }

    /// Adjustment history for one batch, newest first.
    #[instrument(skip(self))]
    pub async fn list_adjustments(
        &self,
        batch_id: i64,
    ) -> Result<Vec<batch_adjustment::Model>, ServiceError> {
        // 404 for a batch that never existed, empty list for one with no history.
        Batch::find_by_id(batch_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;

        BatchAdjustment::find()
            .filter(batch_adjustment::Column::BatchId.eq(batch_id))
            .order_by_desc(batch_adjustment::Column::CreatedAt)
            .order_by_desc(batch_adjustment::Column::Id)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}
