pub mod adjustments;
pub mod alerts;
pub mod catalog;
pub mod purchases;
pub mod query_catalog;
pub mod stock_ledger;
pub mod suppliers;
pub mod users;
