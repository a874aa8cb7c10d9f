//! Configuration for the ledger bridge
//!
//! Credentials are optional at load time: the web process may start without
//! them, and [`LedgerClient::acquire`](crate::client::LedgerClient::acquire)
//! reports the missing values as a configuration error on first use.

use crate::keys::OperatorKey;
use crate::retry::RetryConfig;
use crate::types::{AccountId, TokenId, TopicId};
use crate::{Error, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Network the operator account lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Public test network
    Testnet,
    /// Production network
    Mainnet,
    /// Preview network
    Previewnet,
}

impl NetworkKind {
    /// Default public mirror node for this network
    pub fn mirror_url(&self) -> &'static str {
        match self {
            NetworkKind::Testnet => "https://testnet.mirrornode.hedera.com",
            NetworkKind::Mainnet => "https://mainnet-public.mirrornode.hedera.com",
            NetworkKind::Previewnet => "https://previewnet.mirrornode.hedera.com",
        }
    }
}

/// Ledger bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Operator account (`shard.realm.num`)
    pub operator_id: Option<String>,

    /// Operator private key (DER hex or raw hex)
    pub operator_key: Option<String>,

    /// Preconfigured emergency topic
    pub topic_id: Option<String>,

    /// Preconfigured reward token
    pub reward_token_id: Option<String>,

    /// Target network
    pub network: NetworkKind,

    /// Relay gateway that accepts signed transactions
    pub relay_url: String,

    /// Mirror node override
    pub mirror_url: Option<String>,

    /// Deadline for every network round-trip (milliseconds)
    pub request_timeout_ms: u64,

    /// Event submission retry policy
    pub retry: RetryConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            operator_id: None,
            operator_key: None,
            topic_id: None,
            reward_token_id: None,
            network: NetworkKind::Testnet,
            relay_url: "http://localhost:8080".to_string(),
            mirror_url: None,
            request_timeout_ms: crate::DEFAULT_REQUEST_TIMEOUT_MS,
            retry: RetryConfig::default(),
        }
    }
}

/// Environment variables mapped onto config keys
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HEDERA_OPERATOR_ID", "operator_id"),
    ("HEDERA_OPERATOR_KEY", "operator_key"),
    ("HEDERA_TOPIC_ID", "topic_id"),
    ("HEDERA_EMERGENCY_TOPIC_ID", "topic_id"),
    ("HEDERA_REWARD_TOKEN_ID", "reward_token_id"),
    ("LEDGER_NETWORK", "network"),
    ("LEDGER_RELAY_URL", "relay_url"),
    ("LEDGER_MIRROR_URL", "mirror_url"),
    ("LEDGER_REQUEST_TIMEOUT_MS", "request_timeout_ms"),
    ("LEDGER_SUBMIT_MAX_ATTEMPTS", "retry.max_attempts"),
    ("LEDGER_RETRY_INITIAL_DELAY_MS", "retry.initial_delay_ms"),
    ("LEDGER_RETRY_MAX_DELAY_MS", "retry.max_delay_ms"),
];

impl LedgerConfig {
    /// Load defaults, then `CONFIG_FILE` (if set), then environment
    pub fn from_env() -> Result<Self> {
        let defaults = LedgerConfig::default();

        let mut builder = config::Config::builder()
            .set_default("network", "testnet")?
            .set_default("relay_url", defaults.relay_url)?
            .set_default("request_timeout_ms", defaults.request_timeout_ms)?
            .set_default("retry.max_attempts", defaults.retry.max_attempts)?
            .set_default("retry.initial_delay_ms", defaults.retry.initial_delay_ms)?
            .set_default("retry.max_delay_ms", defaults.retry.max_delay_ms)?;

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("LEDGER_BRIDGE").separator("__"));

        // Later entries win, so the specific topic variable beats the alias
        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = env::var(var) {
                if !value.trim().is_empty() {
                    builder = builder.set_override(*key, value)?;
                }
            }
        }

        let config: LedgerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check values that do not depend on credentials
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms cannot be 0".to_string()));
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }

        if self.relay_url.trim().is_empty() {
            return Err(Error::Config("relay_url is required".to_string()));
        }

        Ok(())
    }

    /// Operator account and key, parsed
    pub fn operator_credentials(&self) -> Result<(AccountId, OperatorKey)> {
        let id = non_empty(&self.operator_id)
            .ok_or_else(|| Error::Config("HEDERA_OPERATOR_ID is not set".to_string()))?;
        let key = non_empty(&self.operator_key)
            .ok_or_else(|| Error::Config("HEDERA_OPERATOR_KEY is not set".to_string()))?;

        Ok((id.parse()?, OperatorKey::parse(key)?))
    }

    /// Topic supplied by configuration, if any
    pub fn preconfigured_topic(&self) -> Result<Option<TopicId>> {
        non_empty(&self.topic_id).map(str::parse).transpose()
    }

    /// Reward token supplied by configuration
    pub fn reward_token(&self) -> Result<TokenId> {
        non_empty(&self.reward_token_id)
            .ok_or_else(|| Error::Config("HEDERA_REWARD_TOKEN_ID is not set".to_string()))?
            .parse()
    }

    /// Mirror node base URL
    pub fn mirror_endpoint(&self) -> &str {
        non_empty(&self.mirror_url).unwrap_or_else(|| self.network.mirror_url())
    }

    /// Per-call deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyEncoding;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.network, NetworkKind::Testnet);
        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.mirror_endpoint(), "https://testnet.mirrornode.hedera.com");
    }

    #[test]
    fn test_missing_credentials() {
        let config = LedgerConfig::default();
        let err = config.operator_credentials().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("HEDERA_OPERATOR_ID")));

        let config = LedgerConfig {
            operator_id: Some("0.0.1001".to_string()),
            operator_key: Some("   ".to_string()),
            ..LedgerConfig::default()
        };
        let err = config.operator_credentials().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("HEDERA_OPERATOR_KEY")));
    }

    #[test]
    fn test_credentials_parse() {
        let key = OperatorKey::from_seed(&[3u8; 32], KeyEncoding::Raw);
        let config = LedgerConfig {
            operator_id: Some("0.0.1001".to_string()),
            operator_key: Some(key.to_der_hex()),
            ..LedgerConfig::default()
        };
        let (id, parsed) = config.operator_credentials().unwrap();
        assert_eq!(id, AccountId::new(0, 0, 1001));
        assert_eq!(parsed.public_key(), key.public_key());
    }

    #[test]
    fn test_preconfigured_topic() {
        let mut config = LedgerConfig::default();
        assert_eq!(config.preconfigured_topic().unwrap(), None);

        config.topic_id = Some("0.0.5005".to_string());
        assert_eq!(config.preconfigured_topic().unwrap(), Some(TopicId::new(0, 0, 5005)));

        config.topic_id = Some("not-a-topic".to_string());
        assert!(matches!(config.preconfigured_topic(), Err(Error::Config(_))));
    }

    // Tests that touch process environment run one at a time
    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    fn clear_env() {
        for (var, _) in ENV_OVERRIDES {
            env::remove_var(var);
        }
        env::remove_var("CONFIG_FILE");
    }

    #[test]
    fn test_from_env_overrides() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        env::set_var("HEDERA_OPERATOR_ID", "0.0.1001");
        env::set_var("HEDERA_TOPIC_ID", "0.0.10");
        env::set_var("HEDERA_EMERGENCY_TOPIC_ID", "0.0.11");
        env::set_var("HEDERA_REWARD_TOKEN_ID", "   ");
        env::set_var("LEDGER_NETWORK", "mainnet");
        env::set_var("LEDGER_REQUEST_TIMEOUT_MS", "1500");
        env::set_var("LEDGER_SUBMIT_MAX_ATTEMPTS", "3");

        let config = LedgerConfig::from_env();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.operator_id.as_deref(), Some("0.0.1001"));
        assert_eq!(config.topic_id.as_deref(), Some("0.0.11"));
        assert_eq!(config.reward_token_id, None);
        assert_eq!(config.network, NetworkKind::Mainnet);
        assert_eq!(config.mirror_endpoint(), "https://mainnet-public.mirrornode.hedera.com");
        assert_eq!(config.request_timeout_ms, 1500);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, RetryConfig::default().initial_delay_ms);
    }

    #[test]
    fn test_topic_alias_used_alone() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        env::set_var("HEDERA_TOPIC_ID", "0.0.10");
        let config = LedgerConfig::from_env();
        clear_env();

        assert_eq!(
            config.unwrap().preconfigured_topic().unwrap(),
            Some(TopicId::new(0, 0, 10))
        );
    }

    #[test]
    fn test_config_file_then_env() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(
            &path,
            "relay_url = \"http://relay.internal:9000\"\n\
             request_timeout_ms = 2000\n\
             \n\
             [retry]\n\
             max_attempts = 2\n",
        )
        .unwrap();

        env::set_var("CONFIG_FILE", &path);
        env::set_var("LEDGER_REQUEST_TIMEOUT_MS", "2500");
        let config = LedgerConfig::from_env();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.relay_url, "http://relay.internal:9000");
        assert_eq!(config.request_timeout_ms, 2500);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.operator_id, None);
    }

    #[test]
    fn test_from_env_rejects_zero_attempts() {
        let _guard = ENV_LOCK.lock();
        clear_env();

        env::set_var("LEDGER_SUBMIT_MAX_ATTEMPTS", "0");
        let result = LedgerConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = LedgerConfig {
            request_timeout_ms: 0,
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
