//! Medical record storage on write-once files
//!
//! A record is serialized to JSON and written as a file: the first
//! [`FILE_CHUNK_SIZE`] bytes go in the creation call, the remainder is
//! appended in successive chunks of the same size, strictly in order. The
//! store never mutates or deletes a file; an update writes a new file and
//! the caller keeps the patient → latest file mapping.
//!
//! Payloads are stored as-is. Encryption belongs between serialization and
//! chunking and is not done here.

use crate::client::LedgerClient;
use crate::metrics::FILE_CHUNKS_WRITTEN;
use crate::network::Operation;
use crate::types::FileId;
use crate::{Error, Result, FILE_CHUNK_SIZE};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Emergency contact of a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    /// Contact name
    pub name: String,
    /// Relationship to the patient
    pub relationship: String,
    /// Phone number
    pub phone: String,
}

/// Medical record of a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    /// Patient identifier
    pub patient_id: String,
    /// Blood type (e.g. `O+`)
    pub blood_type: String,
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
    /// Epoch milliseconds of the last change
    pub last_updated: i64,
}

impl MedicalRecord {
    fn validate(&self) -> Result<()> {
        if self.patient_id.trim().is_empty() {
            return Err(Error::missing("patientId"));
        }
        Ok(())
    }
}

/// Split a payload into file chunks; an empty payload is one empty chunk
pub fn chunk_payload(payload: &Bytes) -> Vec<Bytes> {
    if payload.is_empty() {
        return vec![Bytes::new()];
    }

    (0..payload.len())
        .step_by(FILE_CHUNK_SIZE)
        .map(|start| payload.slice(start..(start + FILE_CHUNK_SIZE).min(payload.len())))
        .collect()
}

/// Stores and retrieves medical records as files
pub struct RecordStore {
    client: Arc<LedgerClient>,
}

impl RecordStore {
    /// Create new record store
    pub fn new(client: Arc<LedgerClient>) -> Self {
        Self { client }
    }

    /// Store a record as a new file
    #[tracing::instrument(skip(self, record), fields(patient_id = %record.patient_id))]
    pub async fn store(&self, record: &MedicalRecord) -> Result<FileId> {
        record.validate()?;
        let payload = Bytes::from(serde_json::to_vec(record)?);
        let file = self.store_bytes(payload).await?;
        info!("Stored medical record for {} as file {}", record.patient_id, file);
        Ok(file)
    }

    /// Write raw bytes as a new file
    ///
    /// If an append fails the call fails; the partially written file id is
    /// logged but never returned.
    pub async fn store_bytes(&self, payload: Bytes) -> Result<FileId> {
        let conn = self.client.acquire()?;
        let mut chunks = chunk_payload(&payload).into_iter();
        let first = chunks.next().unwrap_or_default();

        debug!(
            "Writing {} bytes in {} chunk(s)",
            payload.len(),
            payload.len().div_ceil(FILE_CHUNK_SIZE).max(1)
        );

        let keys = [conn.operator_public_key()];
        let file = conn
            .call(Operation::CreateFile, conn.network().create_file(first, &keys))
            .await?;
        FILE_CHUNKS_WRITTEN.inc();

        for (index, chunk) in chunks.enumerate() {
            if let Err(e) = conn
                .call(Operation::AppendFile, conn.network().append_file(file, chunk))
                .await
            {
                error!(
                    "Append of chunk {} to file {} failed, file left incomplete: {}",
                    index + 1,
                    file,
                    e
                );
                return Err(e);
            }
            FILE_CHUNKS_WRITTEN.inc();
        }

        Ok(file)
    }

    /// Read a file back as raw bytes
    pub async fn fetch_bytes(&self, file: FileId) -> Result<Bytes> {
        let conn = self.client.acquire()?;
        conn.call(Operation::FileContents, conn.network().file_contents(file))
            .await
    }

    /// Fetch and decode a stored record
    ///
    /// Fails with [`Error::NotFound`] for unknown files and for contents
    /// that are not an encoded record.
    #[tracing::instrument(skip(self))]
    pub async fn retrieve(&self, file: FileId) -> Result<MedicalRecord> {
        let contents = self.fetch_bytes(file).await?;

        let record: MedicalRecord = serde_json::from_slice(&contents).map_err(|e| {
            Error::NotFound(format!("file {} does not hold a medical record: {}", file, e))
        })?;

        info!("Retrieved medical record for {} from file {}", record.patient_id, file);
        Ok(record)
    }

    /// Write a new version of a record; `previous` stays untouched
    pub async fn update(&self, previous: FileId, record: &MedicalRecord) -> Result<FileId> {
        let file = self.store(record).await?;
        info!(
            "Medical record for {} superseded: {} -> {}",
            record.patient_id, previous, file
        );
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_boundaries() {
        let sizes = |n: usize| -> Vec<usize> {
            chunk_payload(&Bytes::from(vec![1u8; n]))
                .iter()
                .map(Bytes::len)
                .collect()
        };

        assert_eq!(sizes(0), vec![0]);
        assert_eq!(sizes(10), vec![10]);
        assert_eq!(sizes(4096), vec![4096]);
        assert_eq!(sizes(5000), vec![4096, 904]);
        assert_eq!(sizes(8192), vec![4096, 4096]);
        assert_eq!(sizes(9000), vec![4096, 4096, 808]);
    }

    #[test]
    fn test_record_json_shape() {
        let record = MedicalRecord {
            patient_id: "PATIENT_123".to_string(),
            blood_type: "O+".to_string(),
            allergies: vec!["penicillin".to_string()],
            medications: vec![],
            conditions: vec!["asthma".to_string()],
            emergency_contacts: vec![EmergencyContact {
                name: "Abebe".to_string(),
                relationship: "brother".to_string(),
                phone: "+251911000000".to_string(),
            }],
            last_updated: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["bloodType"], "O+");
        assert_eq!(json["emergencyContacts"][0]["relationship"], "brother");
        assert_eq!(json["lastUpdated"], 1_700_000_000_000i64);
    }
}
