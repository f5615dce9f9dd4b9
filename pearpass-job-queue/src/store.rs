//! Location and lifecycle of the queue file on disk.
//!
//! The extension and the app have no IPC channel; the only thing they share
//! is a filesystem container. When the platform provides an app-group
//! directory visible to both processes the queue lives there, otherwise it
//! falls back to the app-private documents directory (in which case the
//! extension cannot enqueue at all - a platform limitation, not an error).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::attachments::AttachmentStore;
use crate::types::{ATTACHMENTS_DIR_NAME, JOB_DIR_NAME, JOB_FILE_NAME};

/// Resolves and manages the on-disk layout of the job queue.
///
/// Nothing here is fatal: a missing file or directory simply means "no jobs".
#[derive(Debug, Clone)]
pub struct QueueStore {
    root: PathBuf,
}

impl QueueStore {
    /// Pick the storage root for the queue.
    ///
    /// Prefers the shared app-group container when one exists, else the
    /// app-private directory. The `pearpass_jobs` directory is appended to
    /// whichever base wins.
    pub fn resolve(shared_container: Option<&Path>, app_private: &Path) -> Self {
        let base = shared_container.unwrap_or(app_private);
        Self {
            root: base.join(JOB_DIR_NAME),
        }
    }

    /// Use an explicit job directory, bypassing container resolution.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_file_path(&self) -> PathBuf {
        self.root.join(JOB_FILE_NAME)
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.root.join(ATTACHMENTS_DIR_NAME)
    }

    /// Attachment store rooted at this queue's attachments directory.
    pub fn attachment_store(&self) -> AttachmentStore {
        AttachmentStore::new(self.attachments_dir())
    }

    /// Cheap pre-check used by the trigger before touching the vault.
    pub async fn job_file_exists(&self) -> bool {
        tokio::fs::try_exists(self.job_file_path())
            .await
            .unwrap_or(false)
    }

    /// Delete the queue file. Idempotent; a missing file is not an error.
    pub async fn delete_queue_file(&self) {
        let path = self.job_file_path();
        if let Err(err) = tokio::fs::remove_file(&path).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to delete queue file");
            }
        }
    }

    /// Delete the attachments directory and everything under it. Idempotent.
    pub async fn delete_attachments_dir(&self) {
        let path = self.attachments_dir();
        if let Err(err) = tokio::fs::remove_dir_all(&path).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to delete attachments directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_container_wins_over_app_private() {
        let store = QueueStore::resolve(Some(Path::new("/shared/group")), Path::new("/private"));
        assert_eq!(store.root(), Path::new("/shared/group/pearpass_jobs"));

        let store = QueueStore::resolve(None, Path::new("/private"));
        assert_eq!(store.root(), Path::new("/private/pearpass_jobs"));
    }

    #[test]
    fn layout_paths() {
        let store = QueueStore::at("/tmp/q");
        assert_eq!(store.job_file_path(), PathBuf::from("/tmp/q/jobs.enc"));
        assert_eq!(store.attachments_dir(), PathBuf::from("/tmp/q/attachments"));
    }

    #[tokio::test]
    async fn existence_and_deletes_are_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::at(dir.path().join("pearpass_jobs"));

        // Nothing exists yet; deletes on missing paths must not panic.
        assert!(!store.job_file_exists().await);
        store.delete_queue_file().await;
        store.delete_attachments_dir().await;

        tokio::fs::create_dir_all(store.attachments_dir())
            .await
            .unwrap();
        tokio::fs::write(store.job_file_path(), b"PPJQ").await.unwrap();
        tokio::fs::write(store.attachments_dir().join("a.bin"), b"x")
            .await
            .unwrap();
        assert!(store.job_file_exists().await);

        store.delete_queue_file().await;
        store.delete_attachments_dir().await;
        assert!(!store.job_file_exists().await);
        assert!(!store.attachments_dir().exists());
    }
}
