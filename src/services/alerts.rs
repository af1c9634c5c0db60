use crate::{
    db::DbPool,
    entities::{
        alert_log::{self, AlertPriority, AlertType, Entity as AlertLog},
        alert_state::{self, AlertScope, AlertStatus, Entity as AlertState},
        batch::{self, Entity as Batch},
        product::{self, Entity as Product, ProductStatus},
    },
    errors::ServiceError,
    events::PurchaseRecordedEvent,
};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Active product whose aggregate stock sits below its threshold.
#[derive(Debug, Clone, FromQueryResult, Serialize, ToSchema)]
pub struct StockLowRow {
    pub product_id: i64,
    pub product_name: String,
    pub stock_threshold: i32,
    pub total_stock: i64,
}

/// Batch with remaining stock that expires within the alert window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NearExpiryRow {
    pub batch_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub expiration_date: NaiveDate,
    pub stock_quantity: i32,
    pub days_until_expiry: i64,
}

/// Batch with remaining stock past its expiration date.
#[derive(Debug, Clone, FromQueryResult, Serialize, ToSchema)]
pub struct ExpiredRow {
    pub batch_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub expiration_date: NaiveDate,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, FromQueryResult)]
struct BatchExpiryRow {
    batch_id: i64,
    product_id: i64,
    product_name: String,
    expiration_date: NaiveDate,
    stock_quantity: i32,
}

/// What one scan saw and did.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct ScanSummary {
    pub stock_low: usize,
    pub near_expiry: usize,
    pub expired: usize,
    /// States created (each also appends a log row).
    pub created: usize,
    /// Unresolved states whose condition persists; only last_seen_at moved.
    pub refreshed: usize,
    /// Resolved states whose condition cleared and then came back.
    pub reopened: usize,
}

/// One condition a scan observed, ready to be reconciled against state.
struct ObservedCondition {
    scope: AlertScope,
    scope_id: i64,
    alert_type: AlertType,
    message: String,
    detail: serde_json::Value,
    product_id: Option<i64>,
    batch_id: Option<i64>,
}

/// Detects stock-low / near-expiry / expired conditions, keeps the
/// deduplicated alert state table and the append-only history log in
/// step, and drives the PENDING -> VIEWED -> RESOLVED lifecycle.
pub struct AlertService {
    db_pool: Arc<DbPool>,
    expiry_window_days: i64,
}

impl AlertService {
    pub fn new(db_pool: Arc<DbPool>, expiry_window_days: i64) -> Self {
        Self {
            db_pool,
            expiry_window_days,
        }
    }

    // ---- live projections ------------------------------------------------

    /// Active products whose aggregate stock is below their threshold,
    /// independent of any persisted alert state.
    #[instrument(skip(self))]
    pub async fn stock_low_products(&self) -> Result<Vec<StockLowRow>, ServiceError> {
        let total_stock: sea_orm::sea_query::SimpleExpr = Func::coalesce([
            batch::Column::StockQuantity.sum(),
            Expr::val(0).into(),
        ])
        .into();

        Product::find()
            .select_only()
            .column_as(product::Column::Id, "product_id")
            .column_as(product::Column::Name, "product_name")
            .column(product::Column::StockThreshold)
            .column_as(total_stock.clone(), "total_stock")
            .filter(product::Column::Status.eq(ProductStatus::Active.to_string()))
            .left_join(Batch)
            .group_by(product::Column::Id)
            .group_by(product::Column::Name)
            .group_by(product::Column::StockThreshold)
            .having(
                Expr::expr(total_stock)
                    .lt(Expr::col((product::Entity, product::Column::StockThreshold))),
            )
            .into_model::<StockLowRow>()
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Batches with stock that expire within the window, soonest first.
    #[instrument(skip(self))]
    pub async fn near_expiry_batches(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<NearExpiryRow>, ServiceError> {
        let horizon = today + ChronoDuration::days(self.expiry_window_days);

        let rows = self
            .batch_expiry_rows(
                batch::Column::ExpirationDate
                    .gte(today)
                    .and(batch::Column::ExpirationDate.lte(horizon)),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| NearExpiryRow {
                days_until_expiry: (row.expiration_date - today).num_days(),
                batch_id: row.batch_id,
                product_id: row.product_id,
                product_name: row.product_name,
                expiration_date: row.expiration_date,
                stock_quantity: row.stock_quantity,
            })
            .collect())
    }

    /// Batches past their expiration date that still hold stock.
    #[instrument(skip(self))]
    pub async fn expired_batches(&self, today: NaiveDate) -> Result<Vec<ExpiredRow>, ServiceError> {
        let rows = self
            .batch_expiry_rows(batch::Column::ExpirationDate.lt(today))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ExpiredRow {
                batch_id: row.batch_id,
                product_id: row.product_id,
                product_name: row.product_name,
                expiration_date: row.expiration_date,
                stock_quantity: row.stock_quantity,
            })
            .collect())
    }

    async fn batch_expiry_rows(
        &self,
        date_filter: sea_orm::sea_query::SimpleExpr,
    ) -> Result<Vec<BatchExpiryRow>, ServiceError> {
        Batch::find()
            .select_only()
            .column_as(batch::Column::Id, "batch_id")
            .column(batch::Column::ProductId)
            .column_as(product::Column::Name, "product_name")
            .column(batch::Column::ExpirationDate)
            .column(batch::Column::StockQuantity)
            .inner_join(Product)
            .filter(batch::Column::StockQuantity.gt(0))
            .filter(date_filter)
            .order_by_asc(batch::Column::ExpirationDate)
            .into_model::<BatchExpiryRow>()
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    // ---- scan ------------------------------------------------------------

    /// Evaluates every detection rule as of `today` and reconciles the
    /// observations against the deduplicated state table. History rows are
    /// appended only for newly created or reopened states.
    #[instrument(skip(self))]
    pub async fn scan(&self, today: NaiveDate) -> Result<ScanSummary, ServiceError> {
        let stock_low = self.stock_low_products().await?;
        let near_expiry = self.near_expiry_batches(today).await?;
        let expired = self.expired_batches(today).await?;

        let mut summary = ScanSummary {
            stock_low: stock_low.len(),
            near_expiry: near_expiry.len(),
            expired: expired.len(),
            ..Default::default()
        };

        let mut observed = Vec::new();

        for row in &stock_low {
            observed.push(ObservedCondition {
                scope: AlertScope::Product,
                scope_id: row.product_id,
                alert_type: AlertType::StockLow,
                message: format!(
                    "Stock for {} is {} (threshold {})",
                    row.product_name, row.total_stock, row.stock_threshold
                ),
                detail: json!({
                    "product_id": row.product_id,
                    "total_stock": row.total_stock,
                    "stock_threshold": row.stock_threshold,
                }),
                product_id: Some(row.product_id),
                batch_id: None,
            });
        }

        for row in &near_expiry {
            observed.push(ObservedCondition {
                scope: AlertScope::Batch,
                scope_id: row.batch_id,
                alert_type: AlertType::NearExpiry,
                message: format!(
                    "Batch {} of {} expires on {} ({} days left)",
                    row.batch_id, row.product_name, row.expiration_date, row.days_until_expiry
                ),
                detail: json!({
                    "batch_id": row.batch_id,
                    "product_id": row.product_id,
                    "expiration_date": row.expiration_date,
                    "stock_quantity": row.stock_quantity,
                    "days_until_expiry": row.days_until_expiry,
                }),
                product_id: Some(row.product_id),
                batch_id: Some(row.batch_id),
            });
        }

        for row in &expired {
            observed.push(ObservedCondition {
                scope: AlertScope::Batch,
                scope_id: row.batch_id,
                alert_type: AlertType::Expired,
                message: format!(
                    "Batch {} of {} expired on {} with {} units in stock",
                    row.batch_id, row.product_name, row.expiration_date, row.stock_quantity
                ),
                detail: json!({
                    "batch_id": row.batch_id,
                    "product_id": row.product_id,
                    "expiration_date": row.expiration_date,
                    "stock_quantity": row.stock_quantity,
                }),
                product_id: Some(row.product_id),
                batch_id: Some(row.batch_id),
            });
        }

        let observed_keys: Vec<(String, i64, String)> = observed
            .iter()
            .map(|o| {
                (
                    o.scope.to_string(),
                    o.scope_id,
                    o.alert_type.to_string(),
                )
            })
            .collect();

        for condition in &observed {
            match self.reconcile(condition).await? {
                Reconciled::Created => summary.created += 1,
                Reconciled::Refreshed => summary.refreshed += 1,
                Reconciled::Reopened => summary.reopened += 1,
                Reconciled::Dormant => {}
            }
        }

        self.mark_cleared_conditions(&observed_keys).await?;

        info!(
            stock_low = summary.stock_low,
            near_expiry = summary.near_expiry,
            expired = summary.expired,
            created = summary.created,
            reopened = summary.reopened,
            "Alert scan finished"
        );

        Ok(summary)
    }

    async fn reconcile(&self, condition: &ObservedCondition) -> Result<Reconciled, ServiceError> {
        // Concurrent scans race find-then-insert on the unique
        // (scope_type, scope_id, alert_type) index; the loser re-reads the
        // winner's row and reconciles against that instead.
        for _ in 0..2 {
            if let Some(outcome) = self.try_reconcile(condition).await? {
                return Ok(outcome);
            }
        }

        Err(ServiceError::Conflict(format!(
            "Alert state for {} {} kept changing concurrently",
            condition.scope, condition.scope_id
        )))
    }

    async fn find_state(
        &self,
        condition: &ObservedCondition,
    ) -> Result<Option<alert_state::Model>, ServiceError> {
        AlertState::find()
            .filter(alert_state::Column::ScopeType.eq(condition.scope.to_string()))
            .filter(alert_state::Column::ScopeId.eq(condition.scope_id))
            .filter(alert_state::Column::AlertType.eq(condition.alert_type.to_string()))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// One reconcile attempt; `Ok(None)` means a concurrent insert won the
    /// state row and the attempt should be retried against it.
    async fn try_reconcile(
        &self,
        condition: &ObservedCondition,
    ) -> Result<Option<Reconciled>, ServiceError> {
        let db = self.db_pool.as_ref();
        let now = Utc::now();

        let existing = self.find_state(condition).await?;
        let priority = condition.alert_type.default_priority();

        match existing {
            None => {
                let inserted = alert_state::ActiveModel {
                    scope_type: Set(condition.scope.to_string()),
                    scope_id: Set(condition.scope_id),
                    alert_type: Set(condition.alert_type.to_string()),
                    status: Set(AlertStatus::Pending.to_string()),
                    priority: Set(priority.to_string()),
                    message: Set(condition.message.clone()),
                    detail: Set(condition.detail.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    last_seen_at: Set(now),
                    condition_cleared: Set(false),
                    ..Default::default()
                }
                .insert(db)
                .await;

                if let Err(err) = inserted {
                    if self.find_state(condition).await?.is_some() {
                        return Ok(None);
                    }
                    return Err(ServiceError::db_error(err));
                }

                self.append_log(
                    condition.alert_type,
                    priority,
                    &condition.message,
                    condition.detail.clone(),
                    condition.product_id,
                    condition.batch_id,
                )
                .await?;

                Ok(Some(Reconciled::Created))
            }
            Some(state) if state.status != AlertStatus::Resolved.to_string() => {
                let mut update: alert_state::ActiveModel = state.into();
                update.message = Set(condition.message.clone());
                update.detail = Set(condition.detail.clone());
                update.last_seen_at = Set(now);
                update.updated_at = Set(now);
                update.update(db).await.map_err(ServiceError::db_error)?;
                Ok(Some(Reconciled::Refreshed))
            }
            Some(state) if state.condition_cleared => {
                // The condition went away after resolution and is back.
                let mut update: alert_state::ActiveModel = state.into();
                update.status = Set(AlertStatus::Pending.to_string());
                update.priority = Set(priority.to_string());
                update.message = Set(condition.message.clone());
                update.detail = Set(condition.detail.clone());
                update.viewed_at = Set(None);
                update.viewed_by = Set(None);
                update.resolved_at = Set(None);
                update.resolved_by = Set(None);
                update.resolution_notes = Set(None);
                update.condition_cleared = Set(false);
                update.last_seen_at = Set(now);
                update.updated_at = Set(now);
                update.update(db).await.map_err(ServiceError::db_error)?;

                self.append_log(
                    condition.alert_type,
                    priority,
                    &condition.message,
                    condition.detail.clone(),
                    condition.product_id,
                    condition.batch_id,
                )
                .await?;

                Ok(Some(Reconciled::Reopened))
            }
            Some(state) => {
                // Resolved and the condition never cleared; the operator's
                // decision stands.
                let mut update: alert_state::ActiveModel = state.into();
                update.last_seen_at = Set(now);
                update.update(db).await.map_err(ServiceError::db_error)?;
                Ok(Some(Reconciled::Dormant))
            }
        }
    }

    /// Marks resolved scan-managed states whose condition was absent this
    /// scan, arming them for reopening if the condition returns.
    async fn mark_cleared_conditions(
        &self,
        observed_keys: &[(String, i64, String)],
    ) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let scan_types = [
            AlertType::StockLow.to_string(),
            AlertType::NearExpiry.to_string(),
            AlertType::Expired.to_string(),
        ];

        let resolved = AlertState::find()
            .filter(alert_state::Column::AlertType.is_in(scan_types))
            .filter(alert_state::Column::Status.eq(AlertStatus::Resolved.to_string()))
            .filter(alert_state::Column::ConditionCleared.eq(false))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        for state in resolved {
            let key = (
                state.scope_type.clone(),
                state.scope_id,
                state.alert_type.clone(),
            );
            if observed_keys.contains(&key) {
                continue;
            }

            let mut update: alert_state::ActiveModel = state.into();
            update.condition_cleared = Set(true);
            update.updated_at = Set(Utc::now());
            update.update(db).await.map_err(ServiceError::db_error)?;
        }

        Ok(())
    }

    // ---- lifecycle -------------------------------------------------------

    pub async fn get_state(&self, alert_id: i64) -> Result<alert_state::Model, ServiceError> {
        AlertState::find_by_id(alert_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Alert {} not found", alert_id)))
    }

    /// Alert states ordered by severity (critical first), then newest.
    #[instrument(skip(self))]
    pub async fn list_states(
        &self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<alert_state::Model>, ServiceError> {
        let mut query = AlertState::find();
        if let Some(status) = status {
            query = query.filter(alert_state::Column::Status.eq(status.to_string()));
        }

        let mut states = query
            .order_by_desc(alert_state::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        // Priority is stored as text; severity order lives in the enum.
        states.sort_by_key(|s| {
            std::cmp::Reverse(
                AlertPriority::from_str(&s.priority).unwrap_or(AlertPriority::Low),
            )
        });

        Ok(states)
    }

    #[instrument(skip(self))]
    pub async fn view_alert(
        &self,
        alert_id: i64,
        user_id: Option<i64>,
    ) -> Result<alert_state::Model, ServiceError> {
        let state = self.get_state(alert_id).await?;

        if state.status != AlertStatus::Pending.to_string() {
            return Err(ServiceError::Conflict(format!(
                "Alert {} is {} and cannot be marked viewed",
                alert_id, state.status
            )));
        }

        let now = Utc::now();
        let mut update: alert_state::ActiveModel = state.into();
        update.status = Set(AlertStatus::Viewed.to_string());
        update.viewed_at = Set(Some(now));
        update.viewed_by = Set(user_id);
        update.updated_at = Set(now);
        update
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn resolve_alert(
        &self,
        alert_id: i64,
        user_id: Option<i64>,
        notes: Option<String>,
    ) -> Result<alert_state::Model, ServiceError> {
        let state = self.get_state(alert_id).await?;

        if state.status == AlertStatus::Resolved.to_string() {
            return Err(ServiceError::Conflict(format!(
                "Alert {} is already resolved",
                alert_id
            )));
        }

        let now = Utc::now();
        let mut update: alert_state::ActiveModel = state.into();
        update.status = Set(AlertStatus::Resolved.to_string());
        update.resolved_at = Set(Some(now));
        update.resolved_by = Set(user_id);
        update.resolution_notes = Set(notes);
        update.updated_at = Set(now);
        update
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Creates an alert outside the detection rules. The alert must be
    /// anchored to a product or a batch so it dedups like scanned ones.
    #[instrument(skip(self, detail))]
    pub async fn create_manual_alert(
        &self,
        alert_type: AlertType,
        priority: Option<AlertPriority>,
        message: &str,
        detail: serde_json::Value,
        product_id: Option<i64>,
        batch_id: Option<i64>,
    ) -> Result<alert_state::Model, ServiceError> {
        if message.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Alert message must not be empty".to_string(),
            ));
        }

        let (scope, scope_id) = match (batch_id, product_id) {
            (Some(id), _) => (AlertScope::Batch, id),
            (None, Some(id)) => (AlertScope::Product, id),
            (None, None) => {
                return Err(ServiceError::Validation(
                    "A manual alert requires a product_id or batch_id".to_string(),
                ))
            }
        };

        let priority = priority.unwrap_or_else(|| alert_type.default_priority());
        let db = self.db_pool.as_ref();
        let now = Utc::now();

        self.append_log(alert_type, priority, message, detail.clone(), product_id, batch_id)
            .await?;

        let existing = AlertState::find()
            .filter(alert_state::Column::ScopeType.eq(scope.to_string()))
            .filter(alert_state::Column::ScopeId.eq(scope_id))
            .filter(alert_state::Column::AlertType.eq(alert_type.to_string()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;

        match existing {
            Some(state) => {
                warn!(
                    alert_state_id = state.id,
                    "Manual alert re-raised an existing state"
                );
                let mut update: alert_state::ActiveModel = state.into();
                update.status = Set(AlertStatus::Pending.to_string());
                update.priority = Set(priority.to_string());
                update.message = Set(message.to_string());
                update.detail = Set(detail);
                update.viewed_at = Set(None);
                update.viewed_by = Set(None);
                update.resolved_at = Set(None);
                update.resolved_by = Set(None);
                update.resolution_notes = Set(None);
                update.condition_cleared = Set(false);
                update.last_seen_at = Set(now);
                update.updated_at = Set(now);
                update.update(db).await.map_err(ServiceError::db_error)
            }
            None => alert_state::ActiveModel {
                scope_type: Set(scope.to_string()),
                scope_id: Set(scope_id),
                alert_type: Set(alert_type.to_string()),
                status: Set(AlertStatus::Pending.to_string()),
                priority: Set(priority.to_string()),
                message: Set(message.to_string()),
                detail: Set(detail),
                created_at: Set(now),
                updated_at: Set(now),
                last_seen_at: Set(now),
                condition_cleared: Set(false),
                ..Default::default()
            }
            .insert(db)
            .await
            .map_err(ServiceError::db_error),
        }
    }

    // ---- history ---------------------------------------------------------

    /// History rows, newest first.
    #[instrument(skip(self))]
    pub async fn list_log(
        &self,
        alert_type: Option<AlertType>,
        limit: u64,
    ) -> Result<Vec<alert_log::Model>, ServiceError> {
        let mut query = AlertLog::find();
        if let Some(alert_type) = alert_type {
            query = query.filter(alert_log::Column::AlertType.eq(alert_type.to_string()));
        }

        query
            .order_by_desc(alert_log::Column::CreatedAt)
            .order_by_desc(alert_log::Column::Id)
            .limit(limit)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Appends the PURCHASE_RECORDED history entry for a committed
    /// purchase. Pure audit; no alert state is involved.
    pub async fn log_purchase_recorded(
        &self,
        event: &PurchaseRecordedEvent,
    ) -> Result<(), ServiceError> {
        let message = format!(
            "Purchase #{} recorded from {} for {}",
            event.purchase_id, event.supplier_name, event.total
        );

        self.append_log(
            AlertType::PurchaseRecorded,
            AlertType::PurchaseRecorded.default_priority(),
            &message,
            serde_json::to_value(event).map_err(|e| ServiceError::Internal(e.to_string()))?,
            None,
            None,
        )
        .await
    }

    async fn append_log(
        &self,
        alert_type: AlertType,
        priority: AlertPriority,
        message: &str,
        detail: serde_json::Value,
        product_id: Option<i64>,
        batch_id: Option<i64>,
    ) -> Result<(), ServiceError> {
        alert_log::ActiveModel {
            alert_type: Set(alert_type.to_string()),
            priority: Set(priority.to_string()),
            message: Set(message.to_string()),
            detail: Set(detail),
            product_id: Set(product_id),
            batch_id: Set(batch_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        Ok(())
    }
}

enum Reconciled {
    Created,
    Refreshed,
    Reopened,
    Dormant,
}
