//! Trigger glue between the app lifecycle and the job queue processor.
//!
//! A drain cycle is attempted on two events: a vault becoming active, and
//! the app returning to the foreground. Each attempt first counts itself as
//! user activity (so the idle timer cannot preempt a cycle it just allowed),
//! waits a short settle delay, then re-checks whether auto-lock is about to
//! fire; if it is, the cycle is skipped entirely rather than risk a partial
//! attempt. A reentrancy flag keeps overlapping triggers from starting a
//! second cycle while one is in flight - the DB write guard arbitrates
//! against auto-lock, not against the trigger itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use pearpass_job_queue::{DbWriteGuard, QueueStore, VaultClient, VaultRecords};
use pearpass_jobs::process_job_queue;

/// Settle delay after a resume before the queue is touched.
pub const DEFAULT_POST_RESUME_DELAY: Duration = Duration::from_millis(500);

/// Minimum time that must remain before auto-lock fires for a cycle to start.
pub const DEFAULT_SAFETY_THRESHOLD: Duration = Duration::from_millis(1000);

/// App lifecycle phase as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Active,
    Inactive,
    Background,
}

/// Auto-lock subsystem as seen by the trigger.
#[async_trait]
pub trait AutoLockSignals: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Idle timeout after which auto-lock fires, when enabled.
    fn timeout(&self) -> Option<Duration>;

    async fn last_activity(&self) -> Option<DateTime<Utc>>;

    async fn record_activity(&self, at: DateTime<Utc>);

    /// Poke the interaction tracker so queue processing counts as activity.
    fn notify_interaction(&self);
}

/// Tunables for the trigger, sourced from configuration.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub post_resume_delay: Duration,
    pub safety_threshold: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            post_resume_delay: DEFAULT_POST_RESUME_DELAY,
            safety_threshold: DEFAULT_SAFETY_THRESHOLD,
        }
    }
}

/// Drives queue processing off app lifecycle events.
pub struct QueueTrigger<C, R, A> {
    guard: DbWriteGuard,
    store: QueueStore,
    vault_client: Arc<C>,
    records: Arc<R>,
    auto_lock: Arc<A>,
    config: TriggerConfig,
    processing: AtomicBool,
    phase: Mutex<AppPhase>,
}

impl<C, R, A> QueueTrigger<C, R, A>
where
    C: VaultClient,
    R: VaultRecords,
    A: AutoLockSignals,
{
    pub fn new(
        guard: DbWriteGuard,
        store: QueueStore,
        vault_client: Arc<C>,
        records: Arc<R>,
        auto_lock: Arc<A>,
        config: TriggerConfig,
    ) -> Self {
        Self {
            guard,
            store,
            vault_client,
            records,
            auto_lock,
            config,
            processing: AtomicBool::new(false),
            phase: Mutex::new(AppPhase::Active),
        }
    }

    /// A vault finished unlocking and became active.
    pub async fn on_vault_activated(&self, active_vault_id: &str) {
        self.trigger(active_vault_id).await;
    }

    /// The host reported an app lifecycle transition.
    ///
    /// Only a transition into `Active` from a non-active phase triggers a
    /// cycle; `active_vault_id` is `None` while no vault is unlocked.
    pub async fn on_app_phase(&self, next: AppPhase, active_vault_id: Option<&str>) {
        let prev = {
            let mut phase = self.phase.lock().unwrap();
            std::mem::replace(&mut *phase, next)
        };

        if next == AppPhase::Active && prev != AppPhase::Active {
            if let Some(vault_id) = active_vault_id {
                self.trigger(vault_id).await;
            }
        }
    }

    async fn trigger(&self, active_vault_id: &str) {
        self.auto_lock.record_activity(Utc::now()).await;
        self.auto_lock.notify_interaction();

        // Let the resume sequence settle before touching storage.
        tokio::time::sleep(self.config.post_resume_delay).await;

        if !self.auto_lock_is_safe().await {
            info!("auto-lock imminent, skipping job queue processing");
            return;
        }

        self.process(active_vault_id).await;
    }

    /// True when auto-lock either cannot fire or will not fire within the
    /// safety threshold.
    async fn auto_lock_is_safe(&self) -> bool {
        if !self.auto_lock.is_enabled() {
            return true;
        }
        let Some(timeout) = self.auto_lock.timeout() else {
            return true;
        };
        let Some(last_activity) = self.auto_lock.last_activity().await else {
            return true;
        };

        let elapsed = (Utc::now() - last_activity)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let remaining = timeout.saturating_sub(elapsed);
        remaining > self.config.safety_threshold
    }

    async fn process(&self, active_vault_id: &str) {
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        if !self.store.job_file_exists().await {
            self.processing.store(false, Ordering::SeqCst);
            return;
        }

        let outcome = process_job_queue(
            &self.guard,
            &self.store,
            self.vault_client.as_ref(),
            self.records.as_ref(),
            active_vault_id,
        )
        .await;

        if outcome.processed > 0 {
            info!(
                processed = outcome.processed,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "job queue drained"
            );
        }
        if !outcome.errors.is_empty() {
            for failure in &outcome.errors {
                error!(job_id = %failure.job_id, error = %failure.error, "job attempt failed");
            }
        }

        self.processing.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    use chrono::Utc;
    use serde_json::json;

    use pearpass_job_queue::{
        async_trait, Job, JobKind, JobQueueError, JobStatus, NewRecord, Record, RecordCreator,
        RecordPatch, RecordUpdater,
    };

    struct StubVault {
        jobs: StdMutex<Vec<Job>>,
    }

    #[async_trait]
    impl VaultClient for StubVault {
        async fn read_job_queue(&self) -> Result<Vec<Job>, JobQueueError> {
            Ok(self.jobs.lock().unwrap().clone())
        }

        async fn write_job_queue(&self, jobs: &[Job]) -> Result<(), JobQueueError> {
            *self.jobs.lock().unwrap() = jobs.to_vec();
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubRecords {
        created: AtomicUsize,
    }

    #[async_trait]
    impl RecordCreator for StubRecords {
        async fn create_record(&self, record: NewRecord) -> Result<Record, JobQueueError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Record {
                id: "rec-1".into(),
                data: record.data,
            })
        }
    }

    #[async_trait]
    impl RecordUpdater for StubRecords {
        async fn get_record(&self, _id: &str) -> Result<Option<Record>, JobQueueError> {
            Ok(None)
        }

        async fn update_record(&self, _id: &str, _patch: RecordPatch) -> Result<(), JobQueueError> {
            Ok(())
        }
    }

    struct StubAutoLock {
        enabled: bool,
        timeout: Option<Duration>,
        last_activity: StdMutex<Option<DateTime<Utc>>>,
        interactions: AtomicUsize,
    }

    impl StubAutoLock {
        fn disabled() -> Self {
            Self {
                enabled: false,
                timeout: None,
                last_activity: StdMutex::new(None),
                interactions: AtomicUsize::new(0),
            }
        }

        fn imminent() -> Self {
            // Idle long enough that less than the safety threshold remains.
            Self {
                enabled: true,
                timeout: Some(Duration::from_secs(60)),
                last_activity: StdMutex::new(Some(
                    Utc::now() - chrono::Duration::seconds(60),
                )),
                interactions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AutoLockSignals for StubAutoLock {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }

        async fn last_activity(&self) -> Option<DateTime<Utc>> {
            *self.last_activity.lock().unwrap()
        }

        async fn record_activity(&self, _at: DateTime<Utc>) {
            // Keep the stored value: tests control imminence directly.
        }

        fn notify_interaction(&self) {
            self.interactions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pending_job(vault_id: &str) -> Job {
        Job {
            id: "job-1".into(),
            kind: JobKind::AddPasskey,
            status: JobStatus::Pending,
            vault_id: vault_id.into(),
            payload: json!({ "credentialId": "c1", "rpId": "example.com" }),
            retry_count: 0,
            max_retries: 3,
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fast_config() -> TriggerConfig {
        TriggerConfig {
            post_resume_delay: Duration::from_millis(1),
            safety_threshold: DEFAULT_SAFETY_THRESHOLD,
        }
    }

    async fn seeded_store() -> (tempfile::TempDir, QueueStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::at(dir.path().join("pearpass_jobs"));
        tokio::fs::create_dir_all(store.root()).await.unwrap();
        tokio::fs::write(store.job_file_path(), b"PPJQ").await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn vault_activation_drains_the_queue() {
        let (_dir, store) = seeded_store().await;
        let vault = Arc::new(StubVault {
            jobs: StdMutex::new(vec![pending_job("vault-1")]),
        });
        let records = Arc::new(StubRecords::default());
        let auto_lock = Arc::new(StubAutoLock::disabled());

        let trigger = QueueTrigger::new(
            DbWriteGuard::new(),
            store.clone(),
            vault,
            records.clone(),
            auto_lock.clone(),
            fast_config(),
        );

        trigger.on_vault_activated("vault-1").await;

        assert_eq!(records.created.load(Ordering::SeqCst), 1);
        assert_eq!(auto_lock.interactions.load(Ordering::SeqCst), 1);
        // Drained completely: file deleted.
        assert!(!store.job_file_exists().await);
    }

    #[tokio::test]
    async fn imminent_auto_lock_skips_the_cycle() {
        let (_dir, store) = seeded_store().await;
        let vault = Arc::new(StubVault {
            jobs: StdMutex::new(vec![pending_job("vault-1")]),
        });
        let records = Arc::new(StubRecords::default());

        let trigger = QueueTrigger::new(
            DbWriteGuard::new(),
            store.clone(),
            vault,
            records.clone(),
            Arc::new(StubAutoLock::imminent()),
            fast_config(),
        );

        trigger.on_vault_activated("vault-1").await;

        assert_eq!(records.created.load(Ordering::SeqCst), 0);
        assert!(store.job_file_exists().await);
    }

    #[tokio::test]
    async fn missing_job_file_avoids_vault_access() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::at(dir.path().join("pearpass_jobs"));
        let vault = Arc::new(StubVault {
            jobs: StdMutex::new(vec![pending_job("vault-1")]),
        });
        let records = Arc::new(StubRecords::default());

        let trigger = QueueTrigger::new(
            DbWriteGuard::new(),
            store,
            vault.clone(),
            records.clone(),
            Arc::new(StubAutoLock::disabled()),
            fast_config(),
        );

        trigger.on_vault_activated("vault-1").await;

        assert_eq!(records.created.load(Ordering::SeqCst), 0);
        // The stub vault's queue was never consumed.
        assert_eq!(vault.jobs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_background_to_active_edge_fires() {
        let (_dir, store) = seeded_store().await;
        let vault = Arc::new(StubVault {
            jobs: StdMutex::new(vec![pending_job("vault-1")]),
        });
        let records = Arc::new(StubRecords::default());

        let trigger = QueueTrigger::new(
            DbWriteGuard::new(),
            store,
            vault,
            records.clone(),
            Arc::new(StubAutoLock::disabled()),
            fast_config(),
        );

        // Already active: no edge, no drain.
        trigger.on_app_phase(AppPhase::Active, Some("vault-1")).await;
        assert_eq!(records.created.load(Ordering::SeqCst), 0);

        trigger
            .on_app_phase(AppPhase::Background, Some("vault-1"))
            .await;
        trigger.on_app_phase(AppPhase::Active, Some("vault-1")).await;
        assert_eq!(records.created.load(Ordering::SeqCst), 1);
    }
}
