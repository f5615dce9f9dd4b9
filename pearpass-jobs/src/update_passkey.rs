//! UPDATE_PASSKEY handler: replace the credential on an existing record.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use pearpass_job_queue::{
    Attachment, AttachmentRef, AttachmentStore, JobQueueError, RecordPatch, RecordUpdater,
};

use crate::credential::{build_credential_block, CredentialFields};

const KIND: &str = "UPDATE_PASSKEY";

/// Payload written by the extension when a site re-registers a passkey for a
/// record the vault already holds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasskeyPayload {
    pub existing_record_id: Option<String>,
    pub note: Option<String>,
    /// Existing attachments to retain, matched by id, or by name when the
    /// stored attachment has no id. Absent means "keep everything".
    pub keep_attachment_ids: Option<Vec<String>>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub(crate) credential: CredentialFields,
}

/// Filter the record's current attachments down to the kept set.
fn reconcile_existing(existing: &[Value], keep: Option<&[String]>) -> Vec<Value> {
    let Some(keep) = keep else {
        return existing.to_vec();
    };

    existing
        .iter()
        .filter(|att| {
            let key = att
                .get("id")
                .and_then(Value::as_str)
                .or_else(|| att.get("name").and_then(Value::as_str));
            key.is_some_and(|k| keep.iter().any(|kept| kept == k))
        })
        .cloned()
        .collect()
}

/// Handle an UPDATE_PASSKEY job.
///
/// Fetches the target record, swaps in the new credential block, reconciles
/// attachments, and writes the merged data back. Every field the payload
/// does not touch is preserved as-is, including an existing note when the
/// payload carries none.
pub async fn handle_update_passkey(
    payload: &Value,
    attachments: &AttachmentStore,
    records: &dyn RecordUpdater,
) -> Result<(), JobQueueError> {
    if payload.is_null() {
        return Err(JobQueueError::MissingPayload { kind: KIND });
    }

    let payload: UpdatePasskeyPayload = serde_json::from_value(payload.clone())
        .map_err(|e| JobQueueError::InvalidPayload(e.to_string()))?;

    let record_id =
        payload
            .existing_record_id
            .as_deref()
            .ok_or(JobQueueError::MissingField {
                kind: KIND,
                field: "existingRecordId",
            })?;
    let credential_id = payload
        .credential
        .credential_id
        .as_deref()
        .ok_or(JobQueueError::MissingField {
            kind: KIND,
            field: "credentialId",
        })?;

    let existing = records
        .get_record(record_id)
        .await?
        .ok_or_else(|| JobQueueError::RecordNotFound(record_id.to_owned()))?;

    let mut merged: Map<String, Value> = match existing.data {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let existing_attachments = merged
        .get("attachments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut final_attachments =
        reconcile_existing(&existing_attachments, payload.keep_attachment_ids.as_deref());

    let new_attachments: Vec<Attachment> =
        attachments.read_attachments(&payload.attachments).await;
    for att in &new_attachments {
        final_attachments.push(serde_json::to_value(att).expect("attachment serializes"));
    }

    let passkey_created_at = payload
        .created_at
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    merged.insert(
        "credential".into(),
        build_credential_block(credential_id, &payload.credential),
    );
    merged.insert("passkeyCreatedAt".into(), passkey_created_at.into());
    merged.insert("attachments".into(), Value::Array(final_attachments));
    if let Some(note) = &payload.note {
        merged.insert("note".into(), Value::String(note.clone()));
    }

    records
        .update_record(record_id, RecordPatch {
            data: Value::Object(merged),
        })
        .await?;

    attachments.delete_attachments(&payload.attachments).await;

    Ok(())
}
