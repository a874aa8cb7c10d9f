//! Event submitter
//!
//! Validates an [`Event`], resolves the emergency topic and submits the
//! event as one consensus message. Validation happens before anything
//! touches the network.

use crate::client::LedgerClient;
use crate::event::{Event, EventDraft};
use crate::network::Operation;
use crate::retry::RetryPolicy;
use crate::topic::TopicRegistry;
use crate::types::TopicId;
use crate::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    /// Network-reported receipt status
    pub status: String,
    /// Position of the message within the topic, when reported
    pub sequence_number: Option<u64>,
    /// Topic the event was logged to
    pub topic_id: TopicId,
}

/// Publishes events to the emergency topic
pub struct EventSubmitter {
    client: Arc<LedgerClient>,
    topics: Arc<TopicRegistry>,
    retry: RetryPolicy,
}

impl EventSubmitter {
    /// Create new submitter
    pub fn new(client: Arc<LedgerClient>, topics: Arc<TopicRegistry>, retry: RetryPolicy) -> Self {
        Self {
            client,
            topics,
            retry,
        }
    }

    /// Validate and submit an event
    ///
    /// Blocks until the network acknowledges the message. Retries follow the
    /// configured policy; every attempt carries the same payload, idempotency
    /// key included.
    #[tracing::instrument(skip(self, event), fields(kind = event.kind().as_str()))]
    pub async fn submit(&self, event: Event) -> Result<SubmissionResult> {
        event.validate()?;
        let payload = Bytes::from(event.to_bytes()?);
        debug!("Encoded {} event ({} bytes)", event.kind().as_str(), payload.len());

        let conn = self.client.acquire()?;
        let topic = self.topics.resolve(&self.client).await?;

        let receipt = self
            .retry
            .run(Operation::SubmitMessage.name(), || {
                let payload = payload.clone();
                let conn = Arc::clone(&conn);
                async move {
                    conn.call(
                        Operation::SubmitMessage,
                        conn.network().submit_message(topic, payload),
                    )
                    .await
                }
            })
            .await?;

        info!(
            "Submitted {} for {} to topic {}: {} (seq {:?})",
            event.kind().as_str(),
            event.subject_id(),
            topic,
            receipt.status,
            receipt.sequence_number
        );

        Ok(SubmissionResult {
            status: receipt.status,
            sequence_number: receipt.sequence_number,
            topic_id: topic,
        })
    }

    /// Build an event from unchecked input and submit it
    pub async fn submit_draft(&self, draft: EventDraft) -> Result<SubmissionResult> {
        let event = draft.into_event()?;
        self.submit(event).await
    }
}
