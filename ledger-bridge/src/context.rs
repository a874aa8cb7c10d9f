//! Process context
//!
//! [`LedgerContext`] is built once at startup and shared by reference with
//! every request handler. It owns the only process-wide mutable state of the
//! bridge: the cached connection and the cached topic.

use crate::client::LedgerClient;
use crate::config::LedgerConfig;
use crate::http::HttpConnector;
use crate::network::{Connector, Operation};
use crate::record::RecordStore;
use crate::retry::RetryPolicy;
use crate::reward::RewardEngine;
use crate::submitter::EventSubmitter;
use crate::topic::TopicRegistry;
use crate::types::TopicMessage;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Default number of alerts returned by [`LedgerContext::list_alerts`]
pub const DEFAULT_ALERT_LIMIT: usize = 100;

/// Wiring of all ledger components
pub struct LedgerContext {
    config: Arc<LedgerConfig>,
    client: Arc<LedgerClient>,
    topics: Arc<TopicRegistry>,
    submitter: EventSubmitter,
    records: RecordStore,
    rewards: RewardEngine,
}

impl LedgerContext {
    /// Build a context over `connector`
    ///
    /// Fails with a configuration error when a preconfigured topic or token
    /// id is malformed. Missing credentials surface later, on first use.
    pub fn new(config: LedgerConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;
        let preconfigured_topic = config.preconfigured_topic()?;
        let reward_token = match config.reward_token_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(config.reward_token()?),
            _ => None,
        };
        let retry = RetryPolicy::new(config.retry.clone());

        let config = Arc::new(config);
        let client = Arc::new(LedgerClient::new(Arc::clone(&config), connector));
        let topics = Arc::new(TopicRegistry::new(preconfigured_topic));

        Ok(Self {
            submitter: EventSubmitter::new(Arc::clone(&client), Arc::clone(&topics), retry),
            records: RecordStore::new(Arc::clone(&client)),
            rewards: RewardEngine::new(Arc::clone(&client), reward_token),
            config,
            client,
            topics,
        })
    }

    /// Build a context from environment configuration over HTTP
    pub fn from_env() -> Result<Self> {
        let config = LedgerConfig::from_env()?;
        let connector = HttpConnector::new(
            config.relay_url.clone(),
            config.mirror_endpoint().to_string(),
            config.request_timeout(),
        );
        Self::new(config, Arc::new(connector))
    }

    /// Active configuration
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Ledger client
    pub fn client(&self) -> &Arc<LedgerClient> {
        &self.client
    }

    /// Topic registry
    pub fn topics(&self) -> &TopicRegistry {
        &self.topics
    }

    /// Event submitter
    pub fn submitter(&self) -> &EventSubmitter {
        &self.submitter
    }

    /// Record store
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Reward engine
    pub fn rewards(&self) -> &RewardEngine {
        &self.rewards
    }

    /// Read back logged alerts, oldest first
    ///
    /// Never creates a topic; fails with not-found when none is known yet.
    pub async fn list_alerts(&self, limit: usize) -> Result<Vec<TopicMessage>> {
        let topic = self.topics.resolve_existing()?;
        let conn = self.client.acquire()?;

        conn.call(
            Operation::TopicMessages,
            conn.network().topic_messages(topic, limit),
        )
        .await
    }

    /// Release the connection at shutdown
    pub async fn shutdown(&self) {
        self.client.release().await;
        info!("Ledger context shut down");
    }
}
