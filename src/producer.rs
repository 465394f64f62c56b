//! NATS publisher for ranked recommendations.
//!
//! Every message carries the recommendation id as `Nats-Msg-Id`. Ids are
//! derived from (transaction, type), so a re-run publishing the same
//! recommendation is dropped by JetStream's duplicate window.

use crate::types::recommendation::Recommendation;
use anyhow::{Context, Result};
use async_nats::header::NATS_MESSAGE_ID;
use async_nats::{Client, HeaderMap};
use tracing::{debug, error, warn};

pub const HEADER_TRANSACTION_ID: &str = "Transaction-Id";
pub const HEADER_RECOMMENDATION_TYPE: &str = "Recommendation-Type";
pub const HEADER_PRIORITY: &str = "Recommendation-Priority";

/// Routing headers for one recommendation
pub fn headers_for(recommendation: &Recommendation) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(NATS_MESSAGE_ID, recommendation.id.to_string().as_str());
    headers.insert(HEADER_TRANSACTION_ID, recommendation.transaction_id.as_str());
    headers.insert(HEADER_RECOMMENDATION_TYPE, recommendation.rec_type.as_str());
    headers.insert(HEADER_PRIORITY, recommendation.priority.as_str());
    headers
}

#[derive(Clone)]
pub struct RecommendationProducer {
    client: Client,
    subject: String,
}

impl RecommendationProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish one recommendation as JSON with routing headers.
    pub async fn publish(&self, recommendation: &Recommendation) -> Result<()> {
        let payload = serde_json::to_vec(recommendation)
            .with_context(|| format!("Failed to encode recommendation {}", recommendation.id))?;

        self.client
            .publish_with_headers(
                self.subject.clone(),
                headers_for(recommendation),
                payload.into(),
            )
            .await
            .with_context(|| format!("Failed to publish to {}", self.subject))?;

        debug!(
            recommendation_id = %recommendation.id,
            transaction_id = %recommendation.transaction_id,
            rec_type = %recommendation.rec_type,
            priority = %recommendation.priority,
            "Published recommendation"
        );

        Ok(())
    }

    /// Publish a transaction's recommendations in rank order, then flush.
    ///
    /// Failures are logged per recommendation; returns how many were sent.
    pub async fn publish_batch(&self, recommendations: &[Recommendation]) -> usize {
        let mut published = 0;
        for recommendation in recommendations {
            match self.publish(recommendation).await {
                Ok(()) => published += 1,
                Err(e) => {
                    error!(
                        recommendation_id = %recommendation.id,
                        transaction_id = %recommendation.transaction_id,
                        error = %e,
                        "Failed to publish recommendation"
                    );
                }
            }
        }

        if published > 0 {
            if let Err(e) = self.client.flush().await {
                warn!(error = %e, subject = %self.subject, "Flush after batch failed");
            }
        }
        published
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
