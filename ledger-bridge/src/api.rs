//! Inbound operations for the web layer
//!
//! Each operation takes a request body as the web handlers receive it,
//! calls one component and returns an [`ApiResponse`] that serializes
//! straight into the HTTP response. Failures never leak partial results:
//! a failed call carries no identifiers.

use crate::context::{LedgerContext, DEFAULT_ALERT_LIMIT};
use crate::event::{now_millis, EventDraft, EventKind, Location};
use crate::record::{EmergencyContact, MedicalRecord};
use crate::reward::RewardTransfer;
use crate::submitter::SubmissionResult;
use crate::types::{AccountId, FileId, TopicMessage};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// `POST /api/emergency/sos`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    /// Patient identifier
    pub patient_id: Option<String>,
    /// Patient display name
    pub patient_name: Option<String>,
    /// Patient location
    pub location: Option<Location>,
    /// Epoch milliseconds
    pub timestamp: Option<i64>,
}

/// `POST /api/emergency/accept`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    /// Alert identifier
    pub alert_id: Option<String>,
    /// Responder identifier
    pub responder_id: Option<String>,
    /// Responder display name
    pub responder_name: Option<String>,
    /// Responder position
    pub responder_location: Option<Location>,
    /// Epoch milliseconds
    pub timestamp: Option<i64>,
}

/// `POST /api/emergency/arrive`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArriveRequest {
    /// Alert identifier
    pub alert_id: Option<String>,
    /// Responder identifier
    pub responder_id: Option<String>,
    /// Arrival position
    pub arrival_location: Option<Location>,
    /// Epoch milliseconds
    pub timestamp: Option<i64>,
}

/// `POST /api/emergency/complete`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    /// Alert identifier
    pub alert_id: Option<String>,
    /// Responder identifier
    pub responder_id: Option<String>,
    /// Epoch milliseconds
    pub timestamp: Option<i64>,
}

/// `POST /api/medical/store`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecordRequest {
    /// Patient identifier
    pub patient_id: Option<String>,
    /// Blood type
    pub blood_type: Option<String>,
    /// Known allergies
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Current medications
    #[serde(default)]
    pub medications: Vec<String>,
    /// Chronic conditions
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Emergency contacts
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// Reward issuance for a completed response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    /// Responder identifier
    pub responder_id: Option<String>,
    /// Alert identifier
    pub alert_id: Option<String>,
    /// Seconds from SOS to arrival
    pub response_time_seconds: Option<f64>,
    /// Patient rating (1-5)
    pub rating: Option<f64>,
}

/// JSON result returned to the web layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Network receipt status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Consensus sequence number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    /// Topic the event was logged to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    /// File holding the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Reward units transferred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    /// Retrieved record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<MedicalRecord>,
    /// Logged alerts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<TopicMessage>>,
    /// Generic failure text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl ApiResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status: None,
            sequence_number: None,
            topic_id: None,
            file_id: None,
            amount: None,
            record: None,
            alerts: None,
            error: None,
            error_kind: None,
            timestamp: now_millis(),
        }
    }

    fn submitted(message: &str, result: SubmissionResult) -> Self {
        Self {
            status: Some(result.status),
            sequence_number: result.sequence_number,
            topic_id: Some(result.topic_id.to_string()),
            ..Self::ok(message)
        }
    }

    fn failure(action: &str, err: &Error) -> Self {
        error!("Failed to {}: {}", action, err);
        Self {
            success: false,
            message: format!("Failed to {}", action),
            error: Some(format!("Failed to {}", action)),
            error_kind: Some(err.kind()),
            ..Self::ok("")
        }
    }

    /// HTTP status the web layer should answer with
    pub fn http_status(&self) -> u16 {
        match self.error_kind {
            None => 200,
            Some("validation") => 400,
            Some("not_found") => 404,
            Some(_) => 500,
        }
    }
}

fn respond(action: &str, result: Result<ApiResponse>) -> ApiResponse {
    result.unwrap_or_else(|e| ApiResponse::failure(action, &e))
}

/// Entry points called by the web layer
#[derive(Clone)]
pub struct LedgerApi {
    ctx: Arc<LedgerContext>,
}

impl LedgerApi {
    /// Create new API over a shared context
    pub fn new(ctx: Arc<LedgerContext>) -> Self {
        Self { ctx }
    }

    async fn submit(&self, draft: EventDraft, message: &str) -> Result<ApiResponse> {
        let result = self.ctx.submitter().submit_draft(draft).await?;
        Ok(ApiResponse::submitted(message, result))
    }

    /// Log an SOS alert
    pub async fn record_sos(&self, req: SosRequest) -> ApiResponse {
        let draft = EventDraft {
            patient_id: req.patient_id,
            patient_name: req.patient_name,
            location: req.location,
            timestamp: req.timestamp,
            ..EventDraft::new(EventKind::Sos)
        };
        respond(
            "log SOS alert",
            self.submit(draft, "SOS alert logged to consensus service").await,
        )
    }

    /// Log a responder accepting an alert
    pub async fn record_accept(&self, req: AcceptRequest) -> ApiResponse {
        let draft = EventDraft {
            alert_id: req.alert_id,
            responder_id: req.responder_id,
            responder_name: req.responder_name,
            location: req.responder_location,
            timestamp: req.timestamp,
            ..EventDraft::new(EventKind::Accept)
        };
        respond(
            "log accept action",
            self.submit(draft, "Accept action logged to consensus service").await,
        )
    }

    /// Log a responder arriving on scene
    pub async fn record_arrive(&self, req: ArriveRequest) -> ApiResponse {
        let draft = EventDraft {
            alert_id: req.alert_id,
            responder_id: req.responder_id,
            location: req.arrival_location,
            timestamp: req.timestamp,
            ..EventDraft::new(EventKind::Arrive)
        };
        respond(
            "log arrival",
            self.submit(draft, "Arrival logged to consensus service").await,
        )
    }

    /// Log a completed response
    pub async fn record_complete(&self, req: CompleteRequest) -> ApiResponse {
        let draft = EventDraft {
            alert_id: req.alert_id,
            responder_id: req.responder_id,
            timestamp: req.timestamp,
            ..EventDraft::new(EventKind::Complete)
        };
        respond(
            "complete response",
            self.submit(draft, "Response completed and logged to consensus service")
                .await,
        )
    }

    /// Store a medical record
    pub async fn store_medical_record(&self, req: StoreRecordRequest) -> ApiResponse {
        let result = async {
            let record = MedicalRecord {
                patient_id: req.patient_id.ok_or_else(|| Error::missing("patientId"))?,
                blood_type: req.blood_type.unwrap_or_default(),
                allergies: req.allergies,
                medications: req.medications,
                conditions: req.conditions,
                emergency_contacts: req.emergency_contacts,
                last_updated: now_millis(),
            };
            let file = self.ctx.records().store(&record).await?;
            Ok::<_, Error>(ApiResponse {
                file_id: Some(file.to_string()),
                ..ApiResponse::ok("Medical record stored on ledger file service")
            })
        }
        .await;
        respond("store medical record", result)
    }

    /// Fetch a medical record by file id
    pub async fn fetch_medical_record(&self, file_id: &str) -> ApiResponse {
        let result = async {
            let file: FileId = file_id
                .parse()
                .map_err(|_| Error::invalid("fileId", "expected shard.realm.num"))?;
            let record = self.ctx.records().retrieve(file).await?;
            Ok::<_, Error>(ApiResponse {
                file_id: Some(file.to_string()),
                record: Some(record),
                ..ApiResponse::ok("Medical record retrieved")
            })
        }
        .await;
        respond("fetch medical record", result)
    }

    /// Compute and pay a responder reward
    pub async fn issue_reward(&self, req: RewardRequest) -> ApiResponse {
        let result = async {
            let responder: AccountId = req
                .responder_id
                .ok_or_else(|| Error::missing("responderId"))?
                .parse()
                .map_err(|_| Error::invalid("responderId", "expected shard.realm.num"))?;
            let alert_id = req.alert_id.ok_or_else(|| Error::missing("alertId"))?;
            let response_time = req
                .response_time_seconds
                .ok_or_else(|| Error::missing("responseTimeSeconds"))?;
            let rating = req.rating.ok_or_else(|| Error::missing("rating"))?;

            let reward = RewardTransfer::for_response(responder, alert_id, response_time, rating);
            let receipt = self.ctx.rewards().transfer(&reward).await?;

            Ok::<_, Error>(ApiResponse {
                status: Some(receipt.status),
                amount: Some(reward.amount),
                ..ApiResponse::ok("Reward issued")
            })
        }
        .await;
        respond("issue reward", result)
    }

    /// Alerts logged so far, oldest first
    pub async fn list_alerts(&self, limit: Option<usize>) -> ApiResponse {
        let result = async {
            let alerts = self
                .ctx
                .list_alerts(limit.unwrap_or(DEFAULT_ALERT_LIMIT))
                .await?;
            Ok::<_, Error>(ApiResponse {
                alerts: Some(alerts),
                ..ApiResponse::ok("Alerts fetched")
            })
        }
        .await;
        respond("fetch alerts", result)
    }
}
