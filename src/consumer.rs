//! NATS message consumer for incoming transaction records

use crate::error::ValidationError;
use crate::types::transaction::TransactionRecord;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving transaction records from NATS
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Decode and validate a message payload.
    pub fn decode(payload: &[u8]) -> Result<TransactionRecord, ValidationError> {
        TransactionRecord::from_json(payload)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
