//! Cross-process passkey job queue core.
//!
//! The credential-provider extension can mint or update a passkey at the
//! moment a user authenticates, but it cannot open the encrypted vault. It
//! hands the work off through an encrypted job file plus an attachments
//! directory in a container both processes can see; the main app drains the
//! queue the next time the vault is unlocked and in the foreground.
//!
//! This crate holds the pieces shared by the drain pipeline:
//!
//! - [`Job`], [`JobKind`], [`JobStatus`] - the queued unit of work
//! - [`QueueStore`] - location and lifecycle of the queue file on disk
//! - [`AttachmentStore`] - best-effort reads/deletes of attachment payloads
//! - [`DbWriteGuard`] - the handshake that keeps queue writes and auto-lock's
//!   storage teardown from interleaving
//! - [`VaultClient`] / [`RecordCreator`] / [`RecordUpdater`] - collaborator
//!   ports implemented by the vault layer

mod attachments;
mod error;
mod guard;
mod store;
mod types;
mod vault;

pub use attachments::{Attachment, AttachmentStore};
pub use error::JobQueueError;
pub use guard::{DbWriteGuard, DEFAULT_WRITE_WAIT_TIMEOUT};
pub use store::QueueStore;
pub use types::{
    AttachmentRef, Job, JobFailure, JobKind, JobStatus, ProcessOutcome, ATTACHMENTS_DIR_NAME,
    DEFAULT_MAX_RETRIES, FORMAT_VERSION, JOB_DIR_NAME, JOB_FILE_NAME, MAGIC_BYTES,
};
pub use vault::{
    NewRecord, Record, RecordCreator, RecordPatch, RecordUpdater, VaultClient, VaultRecords,
};

// Re-export async_trait for convenience when implementing the vault ports
pub use async_trait::async_trait;
