//! Drain-cycle orchestration.

use tracing::{debug, error, info};

use pearpass_job_queue::{
    DbWriteGuard, JobFailure, JobStatus, ProcessOutcome, QueueStore, VaultClient, VaultRecords,
};

use crate::dispatch::dispatch_job;

/// Run one full drain cycle against the active vault.
///
/// Refusal to acquire the write guard and a failed queue read both yield a
/// zero outcome rather than an error: the caller simply retries on the next
/// trigger, and an unreadable queue is never replaced with a fabricated
/// empty one. Jobs targeting other vaults are left exactly as found. The
/// guard is released on every path out of the cycle.
pub async fn process_job_queue<C, R>(
    guard: &DbWriteGuard,
    store: &QueueStore,
    vault_client: &C,
    records: &R,
    active_vault_id: &str,
) -> ProcessOutcome
where
    C: VaultClient,
    R: VaultRecords,
{
    if !guard.acquire() {
        info!("db write guard not acquired, skipping job queue processing");
        return ProcessOutcome::default();
    }

    let outcome = drain(store, vault_client, records, active_vault_id).await;
    guard.release();
    outcome
}

async fn drain<C, R>(
    store: &QueueStore,
    vault_client: &C,
    records: &R,
    active_vault_id: &str,
) -> ProcessOutcome
where
    C: VaultClient,
    R: VaultRecords,
{
    let mut outcome = ProcessOutcome::default();

    let mut jobs = match vault_client.read_job_queue().await {
        Ok(jobs) => jobs,
        Err(err) => {
            error!(error = %err, "failed to read job queue");
            return outcome;
        }
    };

    if jobs.is_empty() {
        return outcome;
    }

    let attachments = store.attachment_store();

    for job in jobs.iter_mut() {
        if job.status != JobStatus::Pending {
            continue;
        }
        if job.vault_id != active_vault_id {
            debug!(
                job_id = %job.id,
                target_vault = %job.vault_id,
                active_vault = %active_vault_id,
                "skipping job for inactive vault"
            );
            continue;
        }

        outcome.processed += 1;
        job.start();

        match dispatch_job(job, &attachments, records).await {
            Ok(()) => {
                job.complete();
                outcome.succeeded += 1;
            }
            Err(err) => {
                let message = err.to_string();
                job.record_failure(message.clone());
                outcome.failed += 1;
                outcome.errors.push(JobFailure {
                    job_id: job.id.clone(),
                    error: message,
                });
                error!(
                    job_id = %job.id,
                    attempt = job.retry_count,
                    error = %err,
                    "job failed"
                );
            }
        }
    }

    let remaining: Vec<_> = jobs
        .into_iter()
        .filter(|j| j.status != JobStatus::Completed)
        .collect();

    if remaining.is_empty() {
        store.delete_queue_file().await;
        store.delete_attachments_dir().await;
    } else if let Err(err) = vault_client.write_job_queue(&remaining).await {
        // The vault mutations already happened; the stale queue file will be
        // rewritten on the next successful cycle.
        error!(error = %err, "failed to write remaining jobs");
    }

    outcome
}
