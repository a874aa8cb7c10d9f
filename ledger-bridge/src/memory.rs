//! In-process ledger network
//!
//! [`InMemoryNetwork`] implements [`LedgerNetwork`] against in-memory state
//! with the same acceptance rules the real services apply (chunk size
//! limit, token association, treasury balance). It is used for local
//! development and by the test suite, which relies on its call counters,
//! injected failures and artificial latency.
//!
//! `InMemoryNetwork` is cheaply cloneable; all clones share state.

use crate::network::{Connector, LedgerNetwork, Operation, Operator};
use crate::types::*;
use crate::{Error, Result, FILE_CHUNK_SIZE};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SUCCESS: &str = "SUCCESS";

#[derive(Default)]
struct State {
    next_num: u64,
    topics: HashMap<TopicId, Vec<TopicMessage>>,
    files: HashMap<FileId, Vec<Bytes>>,
    tokens: HashMap<TokenId, TokenSpec>,
    associations: HashSet<(TokenId, AccountId)>,
    balances: HashMap<(TokenId, AccountId), u64>,
    calls: HashMap<Operation, u64>,
    failures: HashMap<Operation, VecDeque<String>>,
    latency: HashMap<Operation, Duration>,
}

impl State {
    fn next_entity(&mut self) -> u64 {
        self.next_num += 1;
        self.next_num
    }
}

/// In-memory ledger network
#[derive(Clone)]
pub struct InMemoryNetwork {
    state: Arc<Mutex<State>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryNetwork {
    /// Create an empty network; entity numbers start after `0.0.1000`
    pub fn new() -> Self {
        let state = State {
            next_num: 1000,
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of times `op` was attempted
    pub fn calls(&self, op: Operation) -> u64 {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total attempted operations
    pub fn total_calls(&self) -> u64 {
        self.state.lock().calls.values().sum()
    }

    /// Reject the next attempt of `op` with `status`
    pub fn fail_next(&self, op: Operation, status: impl Into<String>) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(status.into());
    }

    /// Delay every attempt of `op` by `delay`
    pub fn set_latency(&self, op: Operation, delay: Duration) {
        self.state.lock().latency.insert(op, delay);
    }

    /// Messages stored on `topic`
    pub fn messages(&self, topic: TopicId) -> Vec<TopicMessage> {
        self.state
            .lock()
            .topics
            .get(&topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of topics created
    pub fn topic_count(&self) -> usize {
        self.state.lock().topics.len()
    }

    /// Sizes of the chunks written to `file`, in append order
    pub fn chunk_sizes(&self, file: FileId) -> Vec<usize> {
        self.state
            .lock()
            .files
            .get(&file)
            .map(|chunks| chunks.iter().map(Bytes::len).collect())
            .unwrap_or_default()
    }

    /// Number of files created
    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    /// Token balance of `account`
    pub fn balance(&self, token: TokenId, account: AccountId) -> u64 {
        self.state
            .lock()
            .balances
            .get(&(token, account))
            .copied()
            .unwrap_or(0)
    }

    /// Whether [`LedgerNetwork::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Count the attempt, apply latency, then any injected failure
    async fn begin(&self, op: Operation) -> Result<()> {
        let delay = {
            let mut state = self.state.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency.get(&op).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let injected = self
            .state
            .lock()
            .failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front);

        match injected {
            Some(status) => Err(Error::Network(format!("{} rejected: {}", op.name(), status))),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

fn check_chunk(op: Operation, contents: &Bytes) -> Result<()> {
    if contents.len() > FILE_CHUNK_SIZE {
        return Err(Error::Network(format!(
            "{} rejected: TRANSACTION_OVERSIZE ({} bytes)",
            op.name(),
            contents.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl LedgerNetwork for InMemoryNetwork {
    async fn create_topic(&self, _spec: &TopicSpec) -> Result<TopicId> {
        self.begin(Operation::CreateTopic).await?;

        let mut state = self.state.lock();
        let topic = TopicId::new(0, 0, state.next_entity());
        state.topics.insert(topic, Vec::new());
        Ok(topic)
    }

    async fn submit_message(&self, topic: TopicId, payload: Bytes) -> Result<SubmitReceipt> {
        self.begin(Operation::SubmitMessage).await?;

        let mut state = self.state.lock();
        let messages = state
            .topics
            .get_mut(&topic)
            .ok_or_else(|| Error::Network(format!("submit_message rejected: INVALID_TOPIC_ID {}", topic)))?;

        let sequence_number = messages.len() as u64 + 1;
        messages.push(TopicMessage {
            sequence_number,
            consensus_timestamp: format!("{}.000000000", chrono::Utc::now().timestamp()),
            message: String::from_utf8_lossy(&payload).into_owned(),
        });

        Ok(SubmitReceipt {
            status: SUCCESS.to_string(),
            sequence_number: Some(sequence_number),
        })
    }

    async fn topic_messages(&self, topic: TopicId, limit: usize) -> Result<Vec<TopicMessage>> {
        self.begin(Operation::TopicMessages).await?;

        let state = self.state.lock();
        let messages = state
            .topics
            .get(&topic)
            .ok_or_else(|| Error::NotFound(format!("topic {}", topic)))?;
        Ok(messages.iter().take(limit).cloned().collect())
    }

    async fn create_file(&self, contents: Bytes, _keys: &[[u8; 32]]) -> Result<FileId> {
        self.begin(Operation::CreateFile).await?;
        check_chunk(Operation::CreateFile, &contents)?;

        let mut state = self.state.lock();
        let file = FileId::new(0, 0, state.next_entity());
        state.files.insert(file, vec![contents]);
        Ok(file)
    }

    async fn append_file(&self, file: FileId, contents: Bytes) -> Result<()> {
        self.begin(Operation::AppendFile).await?;
        check_chunk(Operation::AppendFile, &contents)?;

        let mut state = self.state.lock();
        let chunks = state
            .files
            .get_mut(&file)
            .ok_or_else(|| Error::Network(format!("append_file rejected: INVALID_FILE_ID {}", file)))?;
        chunks.push(contents);
        Ok(())
    }

    async fn file_contents(&self, file: FileId) -> Result<Bytes> {
        self.begin(Operation::FileContents).await?;

        let state = self.state.lock();
        let chunks = state
            .files
            .get(&file)
            .ok_or_else(|| Error::NotFound(format!("file {}", file)))?;

        let mut buf = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in chunks {
            buf.extend_from_slice(chunk);
        }
        Ok(buf.freeze())
    }

    async fn create_token(&self, spec: &TokenSpec) -> Result<TokenId> {
        self.begin(Operation::CreateToken).await?;

        let mut state = self.state.lock();
        let token = TokenId::new(0, 0, state.next_entity());
        state.associations.insert((token, spec.treasury));
        state.balances.insert((token, spec.treasury), spec.initial_supply);
        state.tokens.insert(token, spec.clone());
        Ok(token)
    }

    async fn associate_token(&self, account: AccountId, token: TokenId) -> Result<()> {
        self.begin(Operation::AssociateToken).await?;

        let mut state = self.state.lock();
        if !state.tokens.contains_key(&token) {
            return Err(Error::Network(format!("associate_token rejected: INVALID_TOKEN_ID {}", token)));
        }
        if !state.associations.insert((token, account)) {
            return Err(Error::Network(
                "associate_token rejected: TOKEN_ALREADY_ASSOCIATED_TO_ACCOUNT".to_string(),
            ));
        }
        Ok(())
    }

    async fn transfer_token(
        &self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<TransferReceipt> {
        self.begin(Operation::TransferToken).await?;

        let mut state = self.state.lock();
        let reject = |status: &str| Error::Network(format!("transfer_token rejected: {}", status));

        if !state.tokens.contains_key(&token) {
            return Err(reject("INVALID_TOKEN_ID"));
        }
        if !state.associations.contains(&(token, from)) || !state.associations.contains(&(token, to)) {
            return Err(reject("TOKEN_NOT_ASSOCIATED_TO_ACCOUNT"));
        }

        let from_balance = state.balances.get(&(token, from)).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(reject("INSUFFICIENT_TOKEN_BALANCE"));
        }

        // Both legs are applied under the same lock or not at all
        state.balances.insert((token, from), from_balance - amount);
        *state.balances.entry((token, to)).or_insert(0) += amount;

        Ok(TransferReceipt {
            status: SUCCESS.to_string(),
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector handing out clones of one shared [`InMemoryNetwork`]
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    network: InMemoryNetwork,
    connects: Arc<AtomicU64>,
}

impl InMemoryConnector {
    /// Wrap an existing network
    pub fn new(network: InMemoryNetwork) -> Self {
        Self {
            network,
            connects: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared network state
    pub fn network(&self) -> &InMemoryNetwork {
        &self.network
    }

    /// Number of connections opened
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for InMemoryConnector {
    fn connect(&self, _operator: &Operator) -> Result<Arc<dyn LedgerNetwork>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.network.closed.store(false, Ordering::SeqCst);
        Ok(Arc::new(self.network.clone()))
    }
}
