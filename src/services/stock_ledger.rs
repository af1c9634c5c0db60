use crate::{
    db::DbPool,
    entities::batch::{self, Entity as Batch},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::sync::Arc;
use tracing::{info, instrument};

/// Authoritative per-batch stock reads and guarded writes. Every write
/// goes through the version column; callers that lose the race get a 409
/// and must re-read.
pub struct StockLedgerService {
    db_pool: Arc<DbPool>,
}

impl StockLedgerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get_batch(&self, batch_id: i64) -> Result<batch::Model, ServiceError> {
        Batch::find_by_id(batch_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))
    }

    /// Lists batches ordered by expiration ascending, optionally scoped to
    /// one product.
    #[instrument(skip(self))]
    pub async fn list_batches(
        &self,
        product_id: Option<i64>,
    ) -> Result<Vec<batch::Model>, ServiceError> {
        let mut query = Batch::find().order_by_asc(batch::Column::ExpirationDate);

        if let Some(product_id) = product_id {
            query = query.filter(batch::Column::ProductId.eq(product_id));
        }

        query
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Sets a batch's stock to an absolute quantity, guarded by the version
    /// the caller read. A stale version means someone else won the race.
    #[instrument(skip(self))]
    pub async fn set_batch_stock(
        &self,
        batch_id: i64,
        new_quantity: i32,
        expected_version: i32,
    ) -> Result<batch::Model, ServiceError> {
        if new_quantity < 0 {
            return Err(ServiceError::NegativeStock(format!(
                "Batch {} stock cannot be set to {}",
                batch_id, new_quantity
            )));
        }

        let db = self.db_pool.as_ref();

        // Existence first, so a missing batch is 404 rather than 409.
        let existing = Batch::find_by_id(batch_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;

        let result = Batch::update_many()
            .col_expr(batch::Column::StockQuantity, Expr::value(new_quantity))
            .col_expr(
                batch::Column::Version,
                Expr::col(batch::Column::Version).add(1),
            )
            .col_expr(batch::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(batch::Column::Id.eq(batch_id))
            .filter(batch::Column::Version.eq(expected_version))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "Batch {} was modified concurrently (expected version {}, found {})",
                batch_id, expected_version, existing.version
            )));
        }

        info!(batch_id, new_quantity, "Batch stock set");

        self.get_batch(batch_id).await
    }

    /// SUM(stock_quantity) over a product's batches. A product with no
    /// batches aggregates to zero.
    #[instrument(skip(self))]
    pub async fn aggregate_stock(&self, product_id: i64) -> Result<i64, ServiceError> {
        let total: Option<i64> = Batch::find()
            .select_only()
            .column_as(batch::Column::StockQuantity.sum(), "total")
            .filter(batch::Column::ProductId.eq(product_id))
            .into_tuple()
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .flatten();

        Ok(total.unwrap_or(0))
    }
}
