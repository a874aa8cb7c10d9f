//! Ledger client: the process-wide network connection
//!
//! A [`LedgerClient`] lazily opens one [`Connection`] from the configured
//! operator credentials and hands the same connection to every caller until
//! [`LedgerClient::release`] drops it. There is no implicit reconnect: a
//! caller that sees a broken connection releases and acquires again.

use crate::config::LedgerConfig;
use crate::metrics::{
    CONNECTIONS_OPENED, CONNECTION_ACTIVE, LEDGER_REQUESTS_TOTAL, LEDGER_REQUEST_DURATION,
};
use crate::network::{Connector, LedgerNetwork, Operation, Operator};
use crate::types::AccountId;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// An open, credential-bound connection to the ledger network
pub struct Connection {
    generation: u64,
    operator: Operator,
    network: Arc<dyn LedgerNetwork>,
    timeout: Duration,
}

impl Connection {
    /// Sequence number of this connection within the client (starts at 1)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Operator account paying for transactions
    pub fn operator_id(&self) -> AccountId {
        self.operator.account_id
    }

    /// Operator public key
    pub fn operator_public_key(&self) -> [u8; 32] {
        self.operator.key.public_key()
    }

    /// Underlying network handle
    pub fn network(&self) -> &dyn LedgerNetwork {
        self.network.as_ref()
    }

    /// Run one network round-trip under the connection deadline
    ///
    /// A call that outlives the deadline fails with [`Error::Timeout`].
    pub async fn call<T, F>(&self, operation: Operation, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let name = operation.name();
        let start = Instant::now();

        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                operation: name.to_string(),
                millis: self.timeout.as_millis() as u64,
            }),
        };

        LEDGER_REQUEST_DURATION
            .with_label_values(&[name])
            .observe(start.elapsed().as_secs_f64());
        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        LEDGER_REQUESTS_TOTAL.with_label_values(&[name, status]).inc();

        if let Err(e) = &result {
            warn!("Ledger {} failed: {}", name, e);
        }

        result
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("generation", &self.generation)
            .field("operator", &self.operator.account_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Owner of the cached connection
pub struct LedgerClient {
    config: Arc<LedgerConfig>,
    connector: Arc<dyn Connector>,
    connection: RwLock<Option<Arc<Connection>>>,
    generations: AtomicU64,
}

impl LedgerClient {
    /// Create new client; nothing is opened until [`acquire`](Self::acquire)
    pub fn new(config: Arc<LedgerConfig>, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            connection: RwLock::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// Return the cached connection, opening it on first use
    ///
    /// Fails with [`Error::Config`] when operator credentials are absent or
    /// malformed. Concurrent first callers open exactly one connection.
    pub fn acquire(&self) -> Result<Arc<Connection>> {
        if let Some(conn) = self.connection.read().as_ref() {
            return Ok(Arc::clone(conn));
        }

        let mut slot = self.connection.write();
        if let Some(conn) = slot.as_ref() {
            return Ok(Arc::clone(conn));
        }

        let (account_id, key) = self.config.operator_credentials()?;
        let operator = Operator { account_id, key };
        let network = self.connector.connect(&operator)?;

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let conn = Arc::new(Connection {
            generation,
            operator,
            network,
            timeout: self.config.request_timeout(),
        });

        info!(
            "Ledger connection #{} opened for operator {}",
            generation, account_id
        );
        CONNECTIONS_OPENED.inc();
        CONNECTION_ACTIVE.set(1);

        *slot = Some(Arc::clone(&conn));
        Ok(conn)
    }

    /// Whether a connection is currently cached
    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Drop the cached connection; a no-op when none is open
    pub async fn release(&self) {
        let conn = self.connection.write().take();

        if let Some(conn) = conn {
            conn.network.close().await;
            CONNECTION_ACTIVE.set(0);
            info!("Ledger connection #{} released", conn.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyEncoding, OperatorKey};
    use crate::memory::InMemoryConnector;

    fn config() -> Arc<LedgerConfig> {
        Arc::new(LedgerConfig {
            operator_id: Some("0.0.1001".to_string()),
            operator_key: Some(OperatorKey::from_seed(&[9u8; 32], KeyEncoding::Raw).to_der_hex()),
            request_timeout_ms: 50,
            ..LedgerConfig::default()
        })
    }

    #[test]
    fn test_acquire_reuses_connection() {
        let connector = InMemoryConnector::default();
        let client = LedgerClient::new(config(), Arc::new(connector.clone()));

        let a = client.acquire().unwrap();
        let b = client.acquire().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.connects(), 1);
        assert_eq!(a.operator_id(), AccountId::new(0, 0, 1001));
    }

    #[test]
    fn test_acquire_without_credentials() {
        let connector = InMemoryConnector::default();
        let client = LedgerClient::new(Arc::new(LedgerConfig::default()), Arc::new(connector.clone()));

        assert!(matches!(client.acquire(), Err(Error::Config(_))));
        assert!(!client.is_connected());
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn test_release_then_acquire_is_fresh() {
        let connector = InMemoryConnector::default();
        let client = LedgerClient::new(config(), Arc::new(connector.clone()));

        let first = client.acquire().unwrap();
        client.release().await;
        assert!(!client.is_connected());
        assert!(connector.network().is_closed());

        let second = client.acquire().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.generation(), first.generation() + 1);
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_release_when_idle_is_noop() {
        let client = LedgerClient::new(config(), Arc::new(InMemoryConnector::default()));
        client.release().await;
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_times_out() {
        let client = LedgerClient::new(config(), Arc::new(InMemoryConnector::default()));
        let conn = client.acquire().unwrap();

        let result: Result<()> = conn
            .call(Operation::SubmitMessage, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::Timeout { millis: 50, .. })));
    }
}
