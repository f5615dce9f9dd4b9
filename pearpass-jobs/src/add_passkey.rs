//! ADD_PASSKEY handler: build and create a new login record.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use pearpass_job_queue::{
    AttachmentRef, AttachmentStore, JobQueueError, NewRecord, RecordCreator,
};

use crate::credential::{build_credential_block, CredentialFields};

const KIND: &str = "ADD_PASSKEY";

/// Payload written by the extension when a passkey is created on a site the
/// vault has no record for.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPasskeyPayload {
    pub rp_id: Option<String>,
    pub rp_name: Option<String>,
    pub title: Option<String>,
    pub user_name: Option<String>,
    pub user_display_name: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub folder: Value,
    pub websites: Option<Vec<String>>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub(crate) credential: CredentialFields,
}

/// Normalise the website list: drop blanks, lowercase, ensure a scheme.
fn format_websites(urls: &[String]) -> Vec<String> {
    urls.iter()
        .filter(|w| !w.trim().is_empty())
        .map(|w| {
            let lower = w.to_lowercase();
            if lower.starts_with("http://") || lower.starts_with("https://") {
                lower
            } else {
                format!("https://{lower}")
            }
        })
        .collect()
}

/// Handle an ADD_PASSKEY job.
///
/// Reads referenced attachments (best-effort), builds a `login` record with
/// the embedded credential block, creates it in the active vault, then
/// deletes the consumed attachment files. Cleanup runs only after a
/// successful create so a retried job still finds its attachments.
pub async fn handle_add_passkey(
    payload: &Value,
    attachments: &AttachmentStore,
    records: &dyn RecordCreator,
) -> Result<(), JobQueueError> {
    if payload.is_null() {
        return Err(JobQueueError::MissingPayload { kind: KIND });
    }

    let payload: AddPasskeyPayload = serde_json::from_value(payload.clone())
        .map_err(|e| JobQueueError::InvalidPayload(e.to_string()))?;

    let credential_id = payload
        .credential
        .credential_id
        .as_deref()
        .ok_or(JobQueueError::MissingField {
            kind: KIND,
            field: "credentialId",
        })?;
    let rp_id = payload.rp_id.as_deref().ok_or(JobQueueError::MissingField {
        kind: KIND,
        field: "rpId",
    })?;

    let read_attachments = attachments.read_attachments(&payload.attachments).await;

    let title = payload
        .title
        .as_deref()
        .or(payload.rp_name.as_deref())
        .unwrap_or(rp_id);
    let username = payload
        .user_name
        .as_deref()
        .or(payload.user_display_name.as_deref())
        .unwrap_or("");
    let websites = match &payload.websites {
        Some(urls) => format_websites(urls),
        None => format_websites(&[format!("https://{rp_id}")]),
    };

    let now_ms = Utc::now().timestamp_millis();
    let passkey_created_at = payload
        .created_at
        .map(|t| t.timestamp_millis())
        .unwrap_or(now_ms);

    let record = NewRecord {
        category: "login".into(),
        folder: payload.folder.clone(),
        is_favorite: false,
        data: json!({
            "title": title,
            "username": username,
            "password": "",
            "passwordUpdatedAt": now_ms,
            "passkeyCreatedAt": passkey_created_at,
            "credential": build_credential_block(credential_id, &payload.credential),
            "note": payload.note.as_deref().unwrap_or(""),
            "websites": websites,
            "customFields": [],
            "attachments": read_attachments,
        }),
    };

    records.create_record(record).await?;

    attachments.delete_attachments(&payload.attachments).await;

    Ok(())
}
