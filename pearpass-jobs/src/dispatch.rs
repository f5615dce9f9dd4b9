//! Routing from job kind to handler.

use pearpass_job_queue::{
    AttachmentStore, Job, JobKind, JobQueueError, RecordCreator, RecordUpdater,
};

use crate::add_passkey::handle_add_passkey;
use crate::update_passkey::handle_update_passkey;

/// Dispatch a job to its kind-specific handler.
///
/// The match is exhaustive over [`JobKind`], so adding a job kind forces a
/// handler decision at compile time. Each handler receives only the record
/// operations it needs. An unrecognised kind fails this job, never the batch.
pub async fn dispatch_job<R>(
    job: &Job,
    attachments: &AttachmentStore,
    records: &R,
) -> Result<(), JobQueueError>
where
    R: RecordCreator + RecordUpdater,
{
    match &job.kind {
        JobKind::AddPasskey => {
            handle_add_passkey(&job.payload, attachments, records as &dyn RecordCreator).await
        }
        JobKind::UpdatePasskey => {
            handle_update_passkey(&job.payload, attachments, records as &dyn RecordUpdater).await
        }
        JobKind::Unknown(kind) => Err(JobQueueError::UnknownKind(kind.clone())),
    }
}
