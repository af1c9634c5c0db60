pub mod alert_log;
pub mod alert_state;
pub mod app_user;
pub mod batch;
pub mod batch_adjustment;
pub mod category;
pub mod product;
pub mod purchase;
pub mod purchase_line;
pub mod supplier;
