//! NATS consumer for incoming receipt submissions

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

use crate::types::receipt::ReceiptSubmission;

/// Consumer for receiving receipt submissions from NATS
pub struct SubmissionConsumer {
    client: Client,
    subject: String,
}

impl SubmissionConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the submission subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to receipt submissions");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a submission message payload
pub fn decode_submission(payload: &[u8]) -> serde_json::Result<ReceiptSubmission> {
    serde_json::from_slice(payload)
}
