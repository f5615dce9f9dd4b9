//! Core types for the passkey job queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Magic marker at the head of the encrypted queue file.
pub const MAGIC_BYTES: &[u8; 4] = b"PPJQ";

/// Queue file format version.
pub const FORMAT_VERSION: u8 = 1;

/// How many times a job is attempted before it becomes `Failed`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Name of the encrypted queue file inside the job directory.
pub const JOB_FILE_NAME: &str = "jobs.enc";

/// Job directory created under the shared (or app-private) container.
pub const JOB_DIR_NAME: &str = "pearpass_jobs";

/// Attachments subdirectory inside the job directory.
pub const ATTACHMENTS_DIR_NAME: &str = "attachments";

/// Kind of deferred work a job carries.
///
/// The wire names are fixed by the extension writer. `Unknown` preserves a
/// kind this build does not recognise so the job round-trips through the
/// queue file unchanged; dispatching it is an error for that job only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobKind {
    AddPasskey,
    UpdatePasskey,
    Unknown(String),
}

impl JobKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AddPasskey => "ADD_PASSKEY",
            Self::UpdatePasskey => "UPDATE_PASSKEY",
            Self::Unknown(kind) => kind,
        }
    }
}

impl From<String> for JobKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ADD_PASSKEY" => Self::AddPasskey,
            "UPDATE_PASSKEY" => Self::UpdatePasskey,
            _ => Self::Unknown(value),
        }
    }
}

impl From<JobKind> for String {
    fn from(kind: JobKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a queued job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true if this status represents a terminal state.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        })
    }
}

/// Reference to an attachment file stored next to the queue.
///
/// The queue only ever holds this triple; the bytes live as plain files under
/// the attachments directory so the small job list is not re-encrypted every
/// time a large payload is enqueued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub relative_path: String,
}

/// A unit of deferred work written by the extension process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub status: JobStatus,
    pub vault_id: String,
    pub payload: Value,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Job {
    /// Mark the job as picked up by the processor.
    pub fn start(&mut self) {
        self.status = JobStatus::InProgress;
        self.updated_at = Utc::now();
    }

    /// Mark the job as completed.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Record a failed attempt.
    ///
    /// Increments the retry count and either re-queues the job as `Pending`
    /// or, once the count reaches `max_retries`, parks it as `Failed`.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.retry_count += 1;
        self.error = Some(message.into());
        self.status = if self.retry_count >= self.max_retries {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        };
        self.updated_at = Utc::now();
    }
}

/// One failed job attempt inside a [`ProcessOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    pub job_id: String,
    pub error: String,
}

/// Summary of a single drain cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<JobFailure>,
}
