//! Best-effort access to attachment payloads referenced by jobs.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::AttachmentRef;

/// An attachment read from disk, ready to be embedded in a vault record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "buffer")]
    pub bytes: Vec<u8>,
}

/// Reads and deletes attachment files under the queue's attachments
/// directory.
///
/// Individual files are treated as expendable: a corrupt or missing
/// attachment is logged and skipped, never failing the owning job.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read the referenced files concurrently, skipping any that fail.
    pub async fn read_attachments(&self, refs: &[AttachmentRef]) -> Vec<Attachment> {
        let reads = refs.iter().map(|r| async move {
            let path = self.dir.join(&r.relative_path);
            match tokio::fs::read(&path).await {
                Ok(bytes) => Some(Attachment {
                    name: r.name.clone(),
                    bytes,
                }),
                Err(err) => {
                    warn!(
                        relative_path = %r.relative_path,
                        error = %err,
                        "failed to read attachment, omitting from record"
                    );
                    None
                }
            }
        });

        futures::future::join_all(reads)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Delete the referenced files. Best-effort and idempotent per file.
    pub async fn delete_attachments(&self, refs: &[AttachmentRef]) {
        for r in refs {
            let path = self.dir.join(&r.relative_path);
            if let Err(err) = tokio::fs::remove_file(&path).await {
                if err.kind() != ErrorKind::NotFound {
                    warn!(
                        relative_path = %r.relative_path,
                        error = %err,
                        "failed to clean up attachment"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn att(name: &str, relative_path: &str) -> AttachmentRef {
        AttachmentRef {
            id: None,
            name: name.into(),
            relative_path: relative_path.into(),
        }
    }

    #[tokio::test]
    async fn reads_existing_files_and_skips_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("good.bin"), b"payload")
            .await
            .unwrap();

        let store = AttachmentStore::new(dir.path());
        let read = store
            .read_attachments(&[att("good", "good.bin"), att("gone", "gone.bin")])
            .await;

        assert_eq!(read.len(), 1);
        assert_eq!(read[0].name, "good");
        assert_eq!(read[0].bytes, b"payload");
    }

    #[tokio::test]
    async fn empty_reference_list_reads_nothing() {
        let store = AttachmentStore::new("/nonexistent");
        assert!(store.read_attachments(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.bin"), b"x").await.unwrap();

        let store = AttachmentStore::new(dir.path());
        let refs = [att("a", "a.bin"), att("missing", "missing.bin")];

        store.delete_attachments(&refs).await;
        assert!(!dir.path().join("a.bin").exists());

        // Second pass over already-deleted files must be a no-op.
        store.delete_attachments(&refs).await;
    }
}
