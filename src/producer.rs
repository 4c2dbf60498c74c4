//! NATS producer for review alerts

use anyhow::Result;
use async_nats::header::NATS_MESSAGE_ID;
use async_nats::{Client, HeaderMap};
use tracing::debug;

use crate::types::alert::ReviewAlert;

pub const RISK_HEADER: &str = "Receipt-Risk";
pub const RECEIPT_ID_HEADER: &str = "Receipt-Id";
pub const SUPERVISOR_HEADER: &str = "Receipt-Supervisor";
pub const DEGRADED_HEADER: &str = "Receipt-Degraded";

/// Publishes review alerts for flagged receipts
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a review alert. Routing metadata goes in headers so
    /// subscribers can filter by risk or supervisor without decoding the body.
    pub async fn publish(&self, alert: &ReviewAlert) -> Result<()> {
        let payload = serde_json::to_vec(alert)?;

        self.client
            .publish_with_headers(self.subject.clone(), alert_headers(alert), payload.into())
            .await?;

        debug!(
            alert_id = %alert.alert_id,
            receipt_id = %alert.receipt_id,
            overall_risk = %alert.overall_risk,
            supervisor_id = alert.supervisor_id.as_deref().unwrap_or("-"),
            "Published review alert"
        );

        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Headers attached to every published alert.
///
/// The alert id doubles as the message id, so a JetStream stream drops
/// redelivered duplicates.
pub fn alert_headers(alert: &ReviewAlert) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(NATS_MESSAGE_ID, alert.alert_id.as_str());
    headers.insert(RISK_HEADER, alert.overall_risk.as_str());
    headers.insert(RECEIPT_ID_HEADER, alert.receipt_id.as_str());
    if let Some(supervisor) = &alert.supervisor_id {
        headers.insert(SUPERVISOR_HEADER, supervisor.as_str());
    }
    headers.insert(DEGRADED_HEADER, if alert.degraded { "true" } else { "false" });
    headers
}
