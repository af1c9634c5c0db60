use reqwest::StatusCode;
use serde_json::json;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::PurchaseRecordedEvent;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Sends purchase-recorded emails through the SendGrid v3 API. Constructed
/// only when both the API key and a recipient are configured; callers treat
/// `None` as "email disabled".
#[derive(Clone)]
pub struct EmailNotifier {
    client: reqwest::Client,
    api_key: String,
    to: String,
    from: String,
}

impl EmailNotifier {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if !config.email_enabled() {
            return None;
        }

        Some(Self {
            client: reqwest::Client::new(),
            api_key: config.sendgrid_api_key.clone()?,
            to: config.purchase_notify_email.clone()?,
            from: config.from_email.clone(),
        })
    }

    #[instrument(skip(self, event), fields(purchase_id = event.purchase_id))]
    pub async fn send_purchase_notification(
        &self,
        event: &PurchaseRecordedEvent,
    ) -> Result<(), ServiceError> {
        let subject = render_subject(event);
        let body = render_body(event);

        let payload = json!({
            "personalizations": [{ "to": [{ "email": self.to }] }],
            "from": { "email": self.from },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Notification(format!("SendGrid request failed: {}", e)))?;

        match response.status() {
            StatusCode::ACCEPTED | StatusCode::OK => {
                info!(purchase_id = event.purchase_id, "Purchase notification sent");
                Ok(())
            }
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(ServiceError::Notification(format!(
                    "SendGrid returned {}: {}",
                    status, detail
                )))
            }
        }
    }
}

fn render_subject(event: &PurchaseRecordedEvent) -> String {
    format!(
        "[FarmaLink] New purchase #{} - {}",
        event.purchase_id, event.supplier_name
    )
}

fn render_body(event: &PurchaseRecordedEvent) -> String {
    let mut body = format!(
        "A new purchase was recorded.\n\n\
         Purchase:  #{}\n\
         Supplier:  {}\n\
         Date:      {}\n\
         Total:     {}\n\n\
         Items received:\n",
        event.purchase_id, event.supplier_name, event.purchase_date, event.total
    );

    for line in &event.lines {
        body.push_str(&format!(
            "  - {} x{} @ {} = {} (expires {})\n",
            line.product_name, line.quantity, line.unit_cost, line.subtotal, line.expiration_date
        ));
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PurchaseLineDetail;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_event() -> PurchaseRecordedEvent {
        PurchaseRecordedEvent {
            purchase_id: 42,
            supplier_id: 1,
            supplier_name: "Pharma Dist SA".into(),
            purchase_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            total: dec!(250.50),
            registered_by: None,
            lines: vec![
                PurchaseLineDetail {
                    product_id: 10,
                    product_name: "Ibuprofen 400mg".into(),
                    quantity: 100,
                    unit_cost: dec!(2.00),
                    subtotal: dec!(200.00),
                    expiration_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                },
                PurchaseLineDetail {
                    product_id: 11,
                    product_name: "Saline 0.9%".into(),
                    quantity: 10,
                    unit_cost: dec!(5.05),
                    subtotal: dec!(50.50),
                    expiration_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                },
            ],
        }
    }

    #[test]
    fn subject_names_purchase_and_supplier() {
        assert_eq!(
            render_subject(&sample_event()),
            "[FarmaLink] New purchase #42 - Pharma Dist SA"
        );
    }

    #[test]
    fn body_lists_every_line_with_expiration() {
        let body = render_body(&sample_event());
        assert!(body.contains("Total:     250.50"));
        assert!(body.contains("Ibuprofen 400mg x100 @ 2.00 = 200.00 (expires 2026-06-01)"));
        assert!(body.contains("Saline 0.9% x10 @ 5.05 = 50.50 (expires 2025-12-31)"));
    }
}
