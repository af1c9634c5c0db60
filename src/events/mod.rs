use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::notifications::EmailNotifier;
use crate::services::alerts::AlertService;

/// One received line inside a purchase event, denormalized so consumers
/// (audit log, email) need no further lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLineDetail {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub subtotal: Decimal,
    pub expiration_date: NaiveDate,
}

/// Payload emitted after a purchase transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecordedEvent {
    pub purchase_id: i64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub purchase_date: NaiveDate,
    pub total: Decimal,
    pub registered_by: Option<i64>,
    pub lines: Vec<PurchaseLineDetail>,
}

/// Events emitted by services after their transaction commits. Consumers
/// are best-effort; a failed consumer never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PurchaseRecorded(PurchaseRecordedEvent),
    PurchaseDeleted {
        purchase_id: i64,
        lines_deleted: u64,
        batches_deleted: u64,
    },
    BatchAdjusted {
        batch_id: i64,
        product_id: i64,
        delta: i32,
        new_quantity: i32,
        reason: String,
        user_id: Option<i64>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Processes events from the channel until all senders drop. Failures are
/// logged and swallowed; the originating request already succeeded.
pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    alerts: Arc<AlertService>,
    mailer: Option<Arc<EmailNotifier>>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::PurchaseRecorded(payload) => {
                if let Err(e) = alerts.log_purchase_recorded(&payload).await {
                    error!(
                        purchase_id = payload.purchase_id,
                        "Failed to log purchase-recorded alert: {}", e
                    );
                }

                if let Some(mailer) = &mailer {
                    if let Err(e) = mailer.send_purchase_notification(&payload).await {
                        error!(
                            purchase_id = payload.purchase_id,
                            "Failed to send purchase notification email: {}", e
                        );
                    }
                }
            }
            Event::PurchaseDeleted {
                purchase_id,
                lines_deleted,
                batches_deleted,
            } => {
                info!(
                    purchase_id,
                    lines_deleted, batches_deleted, "Purchase deleted"
                );
            }
            Event::BatchAdjusted {
                batch_id,
                product_id,
                delta,
                new_quantity,
                ..
            } => {
                info!(batch_id, product_id, delta, new_quantity, "Batch adjusted");
            }
        }
    }

    warn!("Event processing loop has ended");
}

pub type EventReceiver = mpsc::Receiver<Event>;

pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_event() -> Event {
        Event::PurchaseRecorded(PurchaseRecordedEvent {
            purchase_id: 1,
            supplier_id: 2,
            supplier_name: "Droguería Central".into(),
            purchase_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            total: dec!(150.00),
            registered_by: Some(7),
            lines: vec![PurchaseLineDetail {
                product_id: 3,
                product_name: "Amoxicillin 500mg".into(),
                quantity: 50,
                unit_cost: dec!(3.00),
                subtotal: dec!(150.00),
                expiration_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            }],
        })
    }

    #[test]
    fn events_serialize_to_json() {
        let value = serde_json::to_value(sample_event()).unwrap();
        let payload = &value["PurchaseRecorded"];
        assert_eq!(payload["purchase_id"], 1);
        assert_eq!(payload["lines"][0]["quantity"], 50);
    }

    #[tokio::test]
    async fn sender_delivers_events() {
        let (tx, mut rx) = channel(8);
        tx.send(sample_event()).await.unwrap();
        drop(tx);
        assert!(matches!(rx.recv().await, Some(Event::PurchaseRecorded(_))));
        assert!(rx.recv().await.is_none());
    }
}
