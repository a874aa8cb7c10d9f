//! PulsePoint Ledger Bridge
//!
//! Turns emergency-response application events into operations on a
//! distributed ledger network offering three services: an append-only
//! consensus log, write-once chunked file storage and a fungible-token
//! ledger.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          LedgerApi (called by the web layer)         │
//! └──────┬──────────────────┬───────────────────┬────────┘
//!        │                  │                   │
//! ┌──────▼───────┐   ┌──────▼──────┐   ┌────────▼──────┐
//! │EventSubmitter│   │ RecordStore │   │ RewardEngine  │
//! └──┬────────┬──┘   └──────┬──────┘   └────────┬──────┘
//!    │  ┌─────▼────────┐    │                   │
//!    │  │TopicRegistry │    │                   │
//!    │  └─────┬────────┘    │                   │
//! ┌──▼────────▼─────────────▼───────────────────▼──────┐
//! │   LedgerClient (one cached Connection, timeouts)   │
//! └──────────────────────────┬─────────────────────────┘
//!                            │ LedgerNetwork
//!                ┌───────────┴───────────┐
//!          HttpNetwork            InMemoryNetwork
//! ```
//!
//! # Invariants
//!
//! - At most one connection is open per [`LedgerClient`] at a time
//! - At most one topic creation per missing-topic condition, even under
//!   concurrent first use
//! - File chunks are appended strictly in order; a failed append never
//!   yields a file id
//! - A failed network call leaves cached state untouched

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod http;
pub mod keys;
pub mod memory;
pub mod metrics;
pub mod network;
pub mod record;
pub mod retry;
pub mod reward;
pub mod submitter;
pub mod topic;
pub mod types;

pub use api::{ApiResponse, LedgerApi};
pub use client::{Connection, LedgerClient};
pub use config::LedgerConfig;
pub use context::LedgerContext;
pub use error::{Error, Result};
pub use event::{Event, EventDraft, EventKind, Location};
pub use network::{Connector, LedgerNetwork, Operation};
pub use record::{MedicalRecord, RecordStore};
pub use reward::{calculate_reward, RewardEngine, RewardReason, RewardTransfer};
pub use submitter::{EventSubmitter, SubmissionResult};
pub use topic::TopicRegistry;
pub use types::{AccountId, FileId, TokenId, TopicId};

/// Maximum bytes per file creation or append call
pub const FILE_CHUNK_SIZE: usize = 4096;

/// Default deadline for a network round-trip (milliseconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
