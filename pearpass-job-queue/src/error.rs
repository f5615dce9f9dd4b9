//! Error types shared across the job queue pipeline.

use thiserror::Error;

/// Errors that may occur while processing queued jobs.
#[derive(Debug, Error)]
pub enum JobQueueError {
    #[error("{kind} payload is required")]
    MissingPayload { kind: &'static str },

    #[error("{kind} payload missing {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("unknown job kind: {0}")]
    UnknownKind(String),

    #[error("record {0} not found")]
    RecordNotFound(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("vault error: {0}")]
    Vault(String),

    #[error("queue storage error: {0}")]
    Storage(#[from] std::io::Error),
}
