//! Collaborator ports implemented by the vault layer.
//!
//! The queue file shares its at-rest encryption with vault records, so
//! encode/decode of the job list lives behind [`VaultClient`]. Record
//! mutation is split into two narrow ports so each handler only sees the
//! operations it is allowed to perform.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JobQueueError;
use crate::types::Job;

/// Decode/encode of the encrypted queue file, scoped to the active vault.
#[async_trait]
pub trait VaultClient: Send + Sync {
    async fn read_job_queue(&self) -> Result<Vec<Job>, JobQueueError>;
    async fn write_job_queue(&self, jobs: &[Job]) -> Result<(), JobQueueError>;
}

/// A vault record as returned by the record store.
///
/// `data` is kept as an open JSON map so updates can preserve every field
/// this core does not know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub data: Value,
}

/// A new record to be created in the active vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(rename = "type")]
    pub category: String,
    #[serde(default)]
    pub folder: Value,
    pub is_favorite: bool,
    pub data: Value,
}

/// Partial update applied to an existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPatch {
    pub data: Value,
}

/// Creation-only view of the record store (AddPasskey jobs).
#[async_trait]
pub trait RecordCreator: Send + Sync {
    async fn create_record(&self, record: NewRecord) -> Result<Record, JobQueueError>;
}

/// Read/update view of the record store (UpdatePasskey jobs).
#[async_trait]
pub trait RecordUpdater: Send + Sync {
    async fn get_record(&self, id: &str) -> Result<Option<Record>, JobQueueError>;
    async fn update_record(&self, id: &str, patch: RecordPatch) -> Result<(), JobQueueError>;
}

/// Full record store as the processor sees it.
pub trait VaultRecords: RecordCreator + RecordUpdater {}

impl<T: RecordCreator + RecordUpdater> VaultRecords for T {}
