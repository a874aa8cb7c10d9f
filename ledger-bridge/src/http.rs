//! HTTP implementation of the ledger network
//!
//! Writes go to a relay gateway that turns signed JSON requests into
//! network transactions and waits for their receipts. Topic reads go to the
//! public mirror node REST API. Every write body is signed with the
//! operator key; the relay verifies `X-Signature` against `X-Public-Key`
//! before paying for the transaction with `X-Operator-Id`.

use crate::network::{Connector, LedgerNetwork, Operator};
use crate::types::*;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

const SUCCESS: &str = "SUCCESS";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTopicRequest<'a> {
    memo: Option<&'a str>,
    submit_key: Option<String>,
    admin_key: Option<String>,
}

#[derive(Serialize)]
struct MessageRequest {
    message: String,
}

#[derive(Serialize)]
struct CreateFileRequest {
    contents: String,
    keys: Vec<String>,
}

#[derive(Serialize)]
struct AppendFileRequest {
    contents: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssociateRequest {
    account_id: AccountId,
}

#[derive(Serialize)]
struct TransferRequest {
    from: AccountId,
    to: AccountId,
    amount: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    status: String,
    topic_id: Option<TopicId>,
    file_id: Option<FileId>,
    token_id: Option<TokenId>,
    sequence_number: Option<u64>,
}

impl Receipt {
    fn ensure_success(self, operation: &str) -> Result<Self> {
        if self.status == SUCCESS {
            Ok(self)
        } else {
            Err(Error::Network(format!("{} rejected: {}", operation, self.status)))
        }
    }
}

#[derive(Deserialize)]
struct FileContentsResponse {
    contents: String,
}

#[derive(Deserialize)]
struct MirrorMessages {
    messages: Vec<MirrorMessage>,
}

#[derive(Deserialize)]
struct MirrorMessage {
    sequence_number: u64,
    consensus_timestamp: String,
    message: String,
}

/// Relay + mirror HTTP client bound to one operator
pub struct HttpNetwork {
    client: Client,
    relay_url: String,
    mirror_url: String,
    operator: Operator,
}

impl HttpNetwork {
    /// Create new network client
    pub fn new(
        relay_url: impl Into<String>,
        mirror_url: impl Into<String>,
        operator: Operator,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            relay_url: relay_url.into().trim_end_matches('/').to_string(),
            mirror_url: mirror_url.into().trim_end_matches('/').to_string(),
            operator,
        })
    }

    /// Send a signed write to the relay and decode its receipt
    async fn post<B: Serialize>(&self, path: &str, body: &B, operation: &str) -> Result<Receipt> {
        let payload = serde_json::to_vec(body)?;
        let url = format!("{}{}", self.relay_url, path);
        debug!("POST {} ({} bytes)", url, payload.len());

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Operator-Id", self.operator.account_id.to_string())
            .header("X-Public-Key", hex::encode(self.operator.key.public_key()))
            .header("X-Signature", self.operator.key.sign_hex(&payload))
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                error!("{} request failed: {}", operation, e);
                Error::Network(format!("{} request failed: {}", operation, e))
            })?;

        let receipt: Receipt = decode(response, operation).await?;
        receipt.ensure_success(operation)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, operation: &str) -> Result<T> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            error!("{} request failed: {}", operation, e);
            Error::Network(format!("{} request failed: {}", operation, e))
        })?;

        decode(response, operation).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, operation: &str) -> Result<T> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::NotFound(format!("{}: {}", operation, text)));
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::Network(format!(
            "{} failed with status {}: {}",
            operation, status, text
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| Error::Network(format!("{}: failed to parse response: {}", operation, e)))
}

fn missing_id(operation: &str) -> Error {
    Error::Network(format!("{} receipt did not carry an entity id", operation))
}

#[async_trait]
impl LedgerNetwork for HttpNetwork {
    async fn create_topic(&self, spec: &TopicSpec) -> Result<TopicId> {
        let body = CreateTopicRequest {
            memo: spec.memo.as_deref(),
            submit_key: spec.submit_key.map(hex::encode),
            admin_key: spec.admin_key.map(hex::encode),
        };

        self.post("/api/v1/topics", &body, "create_topic")
            .await?
            .topic_id
            .ok_or_else(|| missing_id("create_topic"))
    }

    async fn submit_message(&self, topic: TopicId, payload: Bytes) -> Result<SubmitReceipt> {
        let body = MessageRequest {
            message: BASE64.encode(&payload),
        };

        let receipt = self
            .post(&format!("/api/v1/topics/{}/messages", topic), &body, "submit_message")
            .await?;

        Ok(SubmitReceipt {
            status: receipt.status,
            sequence_number: receipt.sequence_number,
        })
    }

    async fn topic_messages(&self, topic: TopicId, limit: usize) -> Result<Vec<TopicMessage>> {
        let url = format!(
            "{}/api/v1/topics/{}/messages?limit={}&order=asc",
            self.mirror_url, topic, limit
        );
        let page: MirrorMessages = self.get(&url, "topic_messages").await?;

        page.messages
            .into_iter()
            .map(|m| {
                let raw = BASE64.decode(&m.message).map_err(|e| {
                    Error::Network(format!("mirror message {} is not base64: {}", m.sequence_number, e))
                })?;
                Ok(TopicMessage {
                    sequence_number: m.sequence_number,
                    consensus_timestamp: m.consensus_timestamp,
                    message: String::from_utf8_lossy(&raw).into_owned(),
                })
            })
            .collect()
    }

    async fn create_file(&self, contents: Bytes, keys: &[[u8; 32]]) -> Result<FileId> {
        let body = CreateFileRequest {
            contents: BASE64.encode(&contents),
            keys: keys.iter().map(hex::encode).collect(),
        };

        self.post("/api/v1/files", &body, "create_file")
            .await?
            .file_id
            .ok_or_else(|| missing_id("create_file"))
    }

    async fn append_file(&self, file: FileId, contents: Bytes) -> Result<()> {
        let body = AppendFileRequest {
            contents: BASE64.encode(&contents),
        };

        self.post(&format!("/api/v1/files/{}/append", file), &body, "append_file")
            .await
            .map(|_| ())
    }

    async fn file_contents(&self, file: FileId) -> Result<Bytes> {
        let url = format!("{}/api/v1/files/{}/contents", self.relay_url, file);
        let response: FileContentsResponse = self.get(&url, "file_contents").await?;

        BASE64
            .decode(&response.contents)
            .map(Bytes::from)
            .map_err(|e| Error::Network(format!("file {} contents are not base64: {}", file, e)))
    }

    async fn create_token(&self, spec: &TokenSpec) -> Result<TokenId> {
        self.post("/api/v1/tokens", spec, "create_token")
            .await?
            .token_id
            .ok_or_else(|| missing_id("create_token"))
    }

    async fn associate_token(&self, account: AccountId, token: TokenId) -> Result<()> {
        let body = AssociateRequest { account_id: account };

        self.post(&format!("/api/v1/tokens/{}/associations", token), &body, "associate_token")
            .await
            .map(|_| ())
    }

    async fn transfer_token(
        &self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<TransferReceipt> {
        let body = TransferRequest { from, to, amount };

        let receipt = self
            .post(&format!("/api/v1/tokens/{}/transfers", token), &body, "transfer_token")
            .await?;

        Ok(TransferReceipt {
            status: receipt.status,
        })
    }
}

/// Connector producing [`HttpNetwork`] handles
#[derive(Debug, Clone)]
pub struct HttpConnector {
    relay_url: String,
    mirror_url: String,
    timeout: Duration,
}

impl HttpConnector {
    /// Create new connector
    pub fn new(relay_url: impl Into<String>, mirror_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            relay_url: relay_url.into(),
            mirror_url: mirror_url.into(),
            timeout,
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, operator: &Operator) -> Result<Arc<dyn LedgerNetwork>> {
        let network = HttpNetwork::new(
            self.relay_url.clone(),
            self.mirror_url.clone(),
            operator.clone(),
            self.timeout,
        )?;
        Ok(Arc::new(network))
    }
}
