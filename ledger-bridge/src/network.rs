//! Ledger network interface
//!
//! One trait covers the three services the bridge talks to (consensus log,
//! file storage, token ledger) plus the mirror read path. A network handle
//! is bound to a single operator; the [`Connector`] produces one per
//! connection.

use crate::keys::OperatorKey;
use crate::types::*;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Operator credentials a connection is bound to
#[derive(Debug, Clone)]
pub struct Operator {
    /// Paying / signing account
    pub account_id: AccountId,
    /// Signing key
    pub key: OperatorKey,
}

/// Operations exposed by the ledger network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Consensus: create topic
    CreateTopic,
    /// Consensus: submit message
    SubmitMessage,
    /// Mirror: read topic messages
    TopicMessages,
    /// File: create with first chunk
    CreateFile,
    /// File: append chunk
    AppendFile,
    /// File: read contents
    FileContents,
    /// Token: create
    CreateToken,
    /// Token: associate account
    AssociateToken,
    /// Token: transfer
    TransferToken,
}

impl Operation {
    /// Label used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateTopic => "create_topic",
            Operation::SubmitMessage => "submit_message",
            Operation::TopicMessages => "topic_messages",
            Operation::CreateFile => "create_file",
            Operation::AppendFile => "append_file",
            Operation::FileContents => "file_contents",
            Operation::CreateToken => "create_token",
            Operation::AssociateToken => "associate_token",
            Operation::TransferToken => "transfer_token",
        }
    }
}

/// Ledger network client
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    /// Create a topic and wait for its receipt
    async fn create_topic(&self, spec: &TopicSpec) -> Result<TopicId>;

    /// Submit one message to a topic and wait for its receipt
    async fn submit_message(&self, topic: TopicId, payload: Bytes) -> Result<SubmitReceipt>;

    /// Read up to `limit` messages of a topic, oldest first
    async fn topic_messages(&self, topic: TopicId, limit: usize) -> Result<Vec<TopicMessage>>;

    /// Create a file holding the first chunk (at most [`FILE_CHUNK_SIZE`](crate::FILE_CHUNK_SIZE) bytes)
    async fn create_file(&self, contents: Bytes, keys: &[[u8; 32]]) -> Result<FileId>;

    /// Append one chunk to a file
    async fn append_file(&self, file: FileId, contents: Bytes) -> Result<()>;

    /// Full contents of a file, chunks concatenated in append order
    async fn file_contents(&self, file: FileId) -> Result<Bytes>;

    /// Create a fungible token
    async fn create_token(&self, spec: &TokenSpec) -> Result<TokenId>;

    /// Associate an account with a token
    async fn associate_token(&self, account: AccountId, token: TokenId) -> Result<()>;

    /// Move `amount` units of `token` in a single atomic transfer
    async fn transfer_token(
        &self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<TransferReceipt>;

    /// Release transport resources
    async fn close(&self) {}
}

/// Builds a network handle for an operator
pub trait Connector: Send + Sync {
    /// Open a handle bound to `operator`
    fn connect(&self, operator: &Operator) -> Result<Arc<dyn LedgerNetwork>>;
}
