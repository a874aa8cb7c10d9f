//! Error types for the ledger bridge

use thiserror::Error;

/// Result type for ledger bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger bridge errors
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed credentials / identifiers
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or incomplete event/record input
    #[error("Validation error: {field}: {reason}")]
    Validation {
        /// Offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Failed call to the consensus, file or token services
    #[error("Network error: {0}")]
    Network(String),

    /// Network round-trip exceeded its deadline
    #[error("Timeout after {millis}ms: {operation}")]
    Timeout {
        /// Operation name
        operation: String,
        /// Deadline in milliseconds
        millis: u64,
    },

    /// Unknown file or topic, or undecodable contents
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a missing required field
    pub fn missing(field: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: "missing required field".to_string(),
        }
    }

    /// Shorthand for an invalid field value
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for failures of the remote services, timeouts included
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout { .. })
    }

    /// Stable category label
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Validation { .. } => "validation",
            Error::Network(_) | Error::Timeout { .. } => "network",
            Error::NotFound(_) => "not_found",
            Error::Serialization(_) => "serialization",
        }
    }
}

// serde_json::Error is not Clone; its message is carried over instead
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Config(msg) => Error::Config(msg.clone()),
            Error::Validation { field, reason } => Error::Validation {
                field: field.clone(),
                reason: reason.clone(),
            },
            Error::Network(msg) => Error::Network(msg.clone()),
            Error::Timeout { operation, millis } => Error::Timeout {
                operation: operation.clone(),
                millis: *millis,
            },
            Error::NotFound(msg) => Error::NotFound(msg.clone()),
            Error::Serialization(err) => {
                Error::Serialization(<serde_json::Error as serde::de::Error>::custom(err))
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_network() {
        let err = Error::Timeout {
            operation: "submit_message".to_string(),
            millis: 500,
        };
        assert!(err.is_network());
        assert_eq!(err.kind(), "network");
    }

    #[test]
    fn test_missing_names_field() {
        let err = Error::missing("location");
        assert_eq!(err.to_string(), "Validation error: location: missing required field");
        assert!(!err.is_network());
    }

    #[test]
    fn test_clone_keeps_kind_and_message() {
        let err = Error::Timeout {
            operation: "create_topic".to_string(),
            millis: 30_000,
        };
        let copy = err.clone();
        assert_eq!(copy.kind(), "network");
        assert_eq!(copy.to_string(), err.to_string());

        let json = Error::from(serde_json::from_str::<u32>("x").unwrap_err());
        assert_eq!(json.clone().to_string(), json.to_string());
    }
}
