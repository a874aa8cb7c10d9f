//! Topic registry
//!
//! Resolves the consensus topic emergency events are logged to:
//! 1. the cached topic, if one was resolved earlier
//! 2. the preconfigured topic, which is then cached
//! 3. a newly created topic, which is then cached
//!
//! Resolution is single-flight: the creation runs on its own task and every
//! concurrent caller awaits that same task. A caller that is cancelled while
//! waiting neither aborts nor restarts the creation. A failed creation leaves
//! the cache empty so the next caller tries again.

use crate::client::{Connection, LedgerClient};
use crate::metrics::TOPICS_CREATED;
use crate::network::Operation;
use crate::types::{TopicId, TopicSpec};
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Memo used when the setup tool provisions the topic
pub const EMERGENCY_TOPIC_MEMO: &str = "Vita Emergency Response System - Alert Logs";

type Creation = Shared<BoxFuture<'static, Result<TopicId>>>;

/// Process-lifetime cache of the active topic
pub struct TopicRegistry {
    preconfigured: Option<TopicId>,
    cached: Arc<OnceCell<TopicId>>,
    creating: Arc<Mutex<Option<Creation>>>,
}

impl TopicRegistry {
    /// Create a registry, optionally seeded from configuration
    pub fn new(preconfigured: Option<TopicId>) -> Self {
        Self {
            preconfigured,
            cached: Arc::new(OnceCell::new()),
            creating: Arc::new(Mutex::new(None)),
        }
    }

    /// Topic resolved so far, if any
    pub fn cached(&self) -> Option<TopicId> {
        self.cached.get().copied()
    }

    /// Resolve the active topic, creating it if needed
    pub async fn resolve(&self, client: &Arc<LedgerClient>) -> Result<TopicId> {
        if let Some(topic) = self.cached() {
            return Ok(topic);
        }

        if let Some(topic) = self.preconfigured {
            if self.cached.set(topic).is_ok() {
                info!("Using preconfigured emergency topic {}", topic);
            }
            return Ok(topic);
        }

        let creation = {
            let mut slot = self.creating.lock();
            if let Some(topic) = self.cached() {
                return Ok(topic);
            }
            slot.get_or_insert_with(|| self.spawn_creation(Arc::clone(client)))
                .clone()
        };

        creation.await
    }

    /// Start the creation task; it caches its result and clears the slot
    fn spawn_creation(&self, client: Arc<LedgerClient>) -> Creation {
        let cached = Arc::clone(&self.cached);
        let creating = Arc::clone(&self.creating);

        let task = tokio::spawn(async move {
            info!("No topic configured, creating emergency topic");
            let result = create_emergency_topic(&client).await;

            if let Ok(topic) = &result {
                let _ = cached.set(*topic);
                info!(
                    "Created emergency topic {}; set HEDERA_EMERGENCY_TOPIC_ID={} to reuse it",
                    topic, topic
                );
            }
            creating.lock().take();
            result
        });

        task.map(|joined| {
            joined.unwrap_or_else(|e| {
                Err(Error::Network(format!("topic creation task failed: {}", e)))
            })
        })
        .boxed()
        .shared()
    }

    /// Resolve without creating anything
    ///
    /// Fails with [`Error::NotFound`] when no topic is cached or configured.
    pub fn resolve_existing(&self) -> Result<TopicId> {
        self.cached()
            .or(self.preconfigured)
            .ok_or_else(|| Error::NotFound("no emergency topic has been configured or created".to_string()))
    }
}

async fn create_emergency_topic(client: &LedgerClient) -> Result<TopicId> {
    let conn = client.acquire()?;
    let spec = TopicSpec {
        submit_key: Some(conn.operator_public_key()),
        ..TopicSpec::default()
    };
    create_topic(&conn, &spec).await
}

/// Create a topic and wait for its receipt
pub async fn create_topic(conn: &Connection, spec: &TopicSpec) -> Result<TopicId> {
    let topic = conn
        .call(Operation::CreateTopic, conn.network().create_topic(spec))
        .await?;
    TOPICS_CREATED.inc();
    Ok(topic)
}
