use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only alert history. Every alert creation (detected, re-opened
/// or manual) and every recorded purchase lands here; rows are never
/// updated or deleted. Written outside the inventory transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub alert_type: String,
    pub priority: String,
    pub message: String,
    #[sea_orm(column_type = "Json")]
    pub detail: Json,
    pub product_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    StockLow,
    NearExpiry,
    Expired,
    PurchaseRecorded,
}

impl AlertType {
    /// Default priority assigned when the evaluator raises this alert.
    pub fn default_priority(&self) -> AlertPriority {
        match self {
            AlertType::StockLow => AlertPriority::High,
            AlertType::NearExpiry => AlertPriority::Medium,
            AlertType::Expired => AlertPriority::Critical,
            AlertType::PurchaseRecorded => AlertPriority::Low,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn alert_type_round_trips_through_strings() {
        assert_eq!(AlertType::StockLow.to_string(), "STOCK_LOW");
        assert_eq!(AlertType::NearExpiry.to_string(), "NEAR_EXPIRY");
        assert_eq!(AlertType::from_str("EXPIRED").unwrap(), AlertType::Expired);
        assert_eq!(
            AlertType::from_str("PURCHASE_RECORDED").unwrap(),
            AlertType::PurchaseRecorded
        );
    }

    #[test]
    fn priorities_order_by_severity() {
        assert!(AlertPriority::Critical > AlertPriority::High);
        assert!(AlertPriority::High > AlertPriority::Medium);
        assert!(AlertPriority::Medium > AlertPriority::Low);
    }

    #[test]
    fn default_priorities_match_detection_rules() {
        assert_eq!(
            AlertType::StockLow.default_priority(),
            AlertPriority::High
        );
        assert_eq!(
            AlertType::Expired.default_priority(),
            AlertPriority::Critical
        );
    }
}
