use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Deduplicated alert state, keyed by (scope_type, scope_id, alert_type).
/// Lifecycle: PENDING -> VIEWED -> RESOLVED; nothing leaves RESOLVED.
/// History lives in `alert_log`, not here.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_states")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub scope_type: String,
    pub scope_id: i64,
    pub alert_type: String,
    pub status: String,
    pub priority: String,
    pub message: String,
    #[sea_orm(column_type = "Json")]
    pub detail: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub viewed_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<i64>,
    pub resolution_notes: Option<String>,
    /// Set once a scan observes the condition absent while RESOLVED;
    /// gates re-opening so resolved alerts are not re-raised by every
    /// scan of a still-true condition.
    pub condition_cleared: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Viewed,
    Resolved,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertScope {
    Product,
    Batch,
}
