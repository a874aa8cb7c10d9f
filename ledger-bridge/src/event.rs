//! Emergency lifecycle events
//!
//! An [`Event`] is a closed union over the four kinds logged to the
//! consensus topic. Each kind carries only the fields it requires; the
//! loosely-typed [`EventDraft`] received from the web layer is checked
//! field by field when it is turned into an `Event`.
//!
//! Wire form is camelCase JSON tagged by `type`, e.g.
//! `{"type":"SOS","patientId":"p-1","location":{...},"timestamp":...}`.

use crate::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic position with a human-readable address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Street address or free-form description; required for SOS and
    /// arrival locations, optional on acceptance
    #[serde(default)]
    pub address: String,
}

impl Location {
    /// Create new location
    pub fn new(lat: f64, lng: f64, address: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            address: address.into(),
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::invalid(format!("{}.lat", field), "latitude out of range"));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(Error::invalid(format!("{}.lng", field), "longitude out of range"));
        }
        Ok(())
    }
}

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Patient raised an alert
    Sos,
    /// Responder accepted the alert
    Accept,
    /// Responder arrived on scene
    Arrive,
    /// Response completed
    Complete,
}

impl EventKind {
    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Sos => "SOS",
            EventKind::Accept => "ACCEPT",
            EventKind::Arrive => "ARRIVE",
            EventKind::Complete => "COMPLETE",
        }
    }
}

/// Patient raised an SOS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosEvent {
    /// Patient raising the alert
    pub patient_id: String,
    /// Patient display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    /// Where it happened
    pub location: Location,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Stable across submission attempts
    pub idempotency_key: Uuid,
}

/// Responder accepted an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptEvent {
    /// Alert being handled
    pub alert_id: String,
    /// Responder handling the alert
    pub responder_id: String,
    /// Responder display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder_name: Option<String>,
    /// Responder position at acceptance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Stable across submission attempts
    pub idempotency_key: Uuid,
}

/// Responder arrived on scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArriveEvent {
    /// Alert being handled
    pub alert_id: String,
    /// Responder handling the alert
    pub responder_id: String,
    /// Where it happened
    pub location: Location,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Stable across submission attempts
    pub idempotency_key: Uuid,
}

/// Response completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEvent {
    /// Alert being handled
    pub alert_id: String,
    /// Responder handling the alert
    pub responder_id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Stable across submission attempts
    pub idempotency_key: Uuid,
}

/// Event logged to the consensus topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// SOS raised
    Sos(SosEvent),
    /// Alert accepted
    Accept(AcceptEvent),
    /// Responder arrived
    Arrive(ArriveEvent),
    /// Response completed
    Complete(CompleteEvent),
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn require(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::missing(field)),
    }
}

fn check_present(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::missing(field))
    } else {
        Ok(())
    }
}

impl Event {
    /// SOS for `patient_id` at `location`
    pub fn sos(patient_id: impl Into<String>, location: Location) -> Result<Self> {
        EventDraft {
            patient_id: Some(patient_id.into()),
            location: Some(location),
            ..EventDraft::new(EventKind::Sos)
        }
        .into_event()
    }

    /// Acceptance of `alert_id` by `responder_id`
    pub fn accept(
        alert_id: impl Into<String>,
        responder_id: impl Into<String>,
        location: Option<Location>,
    ) -> Result<Self> {
        EventDraft {
            alert_id: Some(alert_id.into()),
            responder_id: Some(responder_id.into()),
            location,
            ..EventDraft::new(EventKind::Accept)
        }
        .into_event()
    }

    /// Arrival of `responder_id` at `location`
    pub fn arrive(
        alert_id: impl Into<String>,
        responder_id: impl Into<String>,
        location: Location,
    ) -> Result<Self> {
        EventDraft {
            alert_id: Some(alert_id.into()),
            responder_id: Some(responder_id.into()),
            location: Some(location),
            ..EventDraft::new(EventKind::Arrive)
        }
        .into_event()
    }

    /// Completion of `alert_id` by `responder_id`
    pub fn complete(alert_id: impl Into<String>, responder_id: impl Into<String>) -> Result<Self> {
        EventDraft {
            alert_id: Some(alert_id.into()),
            responder_id: Some(responder_id.into()),
            ..EventDraft::new(EventKind::Complete)
        }
        .into_event()
    }

    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Sos(_) => EventKind::Sos,
            Event::Accept(_) => EventKind::Accept,
            Event::Arrive(_) => EventKind::Arrive,
            Event::Complete(_) => EventKind::Complete,
        }
    }

    /// Alert identifier, or the patient id for an SOS
    pub fn subject_id(&self) -> &str {
        match self {
            Event::Sos(e) => &e.patient_id,
            Event::Accept(e) => &e.alert_id,
            Event::Arrive(e) => &e.alert_id,
            Event::Complete(e) => &e.alert_id,
        }
    }

    /// Event timestamp (epoch milliseconds)
    pub fn timestamp(&self) -> i64 {
        match self {
            Event::Sos(e) => e.timestamp,
            Event::Accept(e) => e.timestamp,
            Event::Arrive(e) => e.timestamp,
            Event::Complete(e) => e.timestamp,
        }
    }

    /// Key identifying this event across submission attempts
    pub fn idempotency_key(&self) -> Uuid {
        match self {
            Event::Sos(e) => e.idempotency_key,
            Event::Accept(e) => e.idempotency_key,
            Event::Arrive(e) => e.idempotency_key,
            Event::Complete(e) => e.idempotency_key,
        }
    }

    /// Re-check required fields
    ///
    /// Variant fields are public, so an event built by hand is checked
    /// again before it is submitted.
    pub fn validate(&self) -> Result<()> {
        match self {
            Event::Sos(e) => {
                check_present("patientId", &e.patient_id)?;
                e.location.validate("location")?;
                check_present("location.address", &e.location.address)
            }
            Event::Accept(e) => {
                check_present("alertId", &e.alert_id)?;
                check_present("responderId", &e.responder_id)?;
                match &e.location {
                    Some(location) => location.validate("location"),
                    None => Ok(()),
                }
            }
            Event::Arrive(e) => {
                check_present("alertId", &e.alert_id)?;
                check_present("responderId", &e.responder_id)?;
                e.location.validate("location")?;
                check_present("location.address", &e.location.address)
            }
            Event::Complete(e) => {
                check_present("alertId", &e.alert_id)?;
                check_present("responderId", &e.responder_id)
            }
        }
    }

    /// Canonical wire encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Unchecked event input, as received from the web layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    /// Event kind
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Patient (SOS)
    #[serde(default)]
    pub patient_id: Option<String>,
    /// Patient display name (SOS)
    #[serde(default)]
    pub patient_name: Option<String>,
    /// Alert (ACCEPT / ARRIVE / COMPLETE)
    #[serde(default)]
    pub alert_id: Option<String>,
    /// Responder (ACCEPT / ARRIVE / COMPLETE)
    #[serde(default)]
    pub responder_id: Option<String>,
    /// Responder display name (ACCEPT)
    #[serde(default)]
    pub responder_name: Option<String>,
    /// Patient, responder or arrival location
    #[serde(default)]
    pub location: Option<Location>,
    /// Epoch milliseconds; defaults to now
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl EventDraft {
    /// Empty draft of `kind`
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            patient_id: None,
            patient_name: None,
            alert_id: None,
            responder_id: None,
            responder_name: None,
            location: None,
            timestamp: None,
        }
    }

    /// Check required fields for the kind and build the event
    pub fn into_event(self) -> Result<Event> {
        let timestamp = self.timestamp.unwrap_or_else(now_millis);
        if timestamp < 0 {
            return Err(Error::invalid("timestamp", "must not be negative"));
        }
        let idempotency_key = Uuid::now_v7();

        let event = match self.kind {
            EventKind::Sos => Event::Sos(SosEvent {
                patient_id: require("patientId", self.patient_id)?,
                patient_name: self.patient_name,
                location: self.location.ok_or_else(|| Error::missing("location"))?,
                timestamp,
                idempotency_key,
            }),
            EventKind::Accept => Event::Accept(AcceptEvent {
                alert_id: require("alertId", self.alert_id)?,
                responder_id: require("responderId", self.responder_id)?,
                responder_name: self.responder_name,
                location: self.location,
                timestamp,
                idempotency_key,
            }),
            EventKind::Arrive => Event::Arrive(ArriveEvent {
                alert_id: require("alertId", self.alert_id)?,
                responder_id: require("responderId", self.responder_id)?,
                location: self.location.ok_or_else(|| Error::missing("location"))?,
                timestamp,
                idempotency_key,
            }),
            EventKind::Complete => Event::Complete(CompleteEvent {
                alert_id: require("alertId", self.alert_id)?,
                responder_id: require("responderId", self.responder_id)?,
                timestamp,
                idempotency_key,
            }),
        };

        event.validate()?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addis() -> Location {
        Location::new(9.03, 38.74, "Addis Ababa")
    }

    #[test]
    fn test_sos_requires_location() {
        let draft = EventDraft {
            patient_id: Some("PATIENT_123".to_string()),
            ..EventDraft::new(EventKind::Sos)
        };
        let err = draft.into_event().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "location"));
    }

    #[test]
    fn test_blank_ids_are_missing() {
        let err = Event::complete("  ", "RESPONDER_456").unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "alertId"));

        let err = Event::accept("ALERT_001", "", None).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "responderId"));
    }

    #[test]
    fn test_arrive_requires_location() {
        let draft = EventDraft {
            alert_id: Some("ALERT_001".to_string()),
            responder_id: Some("RESPONDER_456".to_string()),
            ..EventDraft::new(EventKind::Arrive)
        };
        assert!(matches!(
            draft.into_event(),
            Err(Error::Validation { ref field, .. }) if field == "location"
        ));
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let err = Event::sos("PATIENT_123", Location::new(91.0, 0.0, "")).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "location.lat"));
    }

    #[test]
    fn test_sos_and_arrive_require_address() {
        let err = Event::sos("PATIENT_123", Location::new(9.03, 38.74, " ")).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "location.address"));

        let err = Event::arrive("ALERT_001", "RESPONDER_456", Location::new(9.03, 38.74, ""))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "location.address"));

        let accept = Event::accept("ALERT_001", "RESPONDER_456", Some(Location::new(9.03, 38.74, "")));
        assert!(accept.is_ok());
    }

    #[test]
    fn test_sos_location_without_address_field() {
        let draft: EventDraft = serde_json::from_str(
            r#"{"type":"SOS","patientId":"PATIENT_123","location":{"lat":9.03,"lng":38.74}}"#,
        )
        .unwrap();
        assert!(matches!(
            draft.into_event(),
            Err(Error::Validation { ref field, .. }) if field == "location.address"
        ));
    }

    #[test]
    fn test_wire_format() {
        let event = Event::sos("PATIENT_123", addis()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&event.to_bytes().unwrap()).unwrap();

        assert_eq!(json["type"], "SOS");
        assert_eq!(json["patientId"], "PATIENT_123");
        assert_eq!(json["location"]["address"], "Addis Ababa");
        assert!(json.get("patientName").is_none());
        assert!(json["idempotencyKey"].is_string());
        assert_eq!(event.idempotency_key().get_version_num(), 7);
    }

    #[test]
    fn test_draft_from_json_keeps_timestamp() {
        let draft: EventDraft = serde_json::from_str(
            r#"{"type":"COMPLETE","alertId":"ALERT_001","responderId":"R-1","timestamp":1700000000000}"#,
        )
        .unwrap();
        let event = draft.into_event().unwrap();

        assert_eq!(event.kind(), EventKind::Complete);
        assert_eq!(event.timestamp(), 1_700_000_000_000);
        assert_eq!(event.subject_id(), "ALERT_001");
    }

    #[test]
    fn test_hand_built_event_is_revalidated() {
        let event = Event::Complete(CompleteEvent {
            alert_id: String::new(),
            responder_id: "R-1".to_string(),
            timestamp: 0,
            idempotency_key: Uuid::nil(),
        });
        assert!(event.validate().is_err());
    }
}
