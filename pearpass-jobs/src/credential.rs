//! Shared WebAuthn credential block construction.

use serde::Deserialize;
use serde_json::{json, Value};

/// COSE algorithm used when the payload does not specify one (ES256).
pub(crate) const DEFAULT_ALGORITHM: i64 = -7;

/// Transports reported when the payload does not specify any.
pub(crate) const DEFAULT_TRANSPORTS: &[&str] = &["internal"];

/// Credential material common to both passkey payloads.
///
/// Everything except `credential_id` is optional and carried through as
/// opaque JSON; the vault layer is responsible for protecting the private
/// key and user id at rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredentialFields {
    pub credential_id: Option<String>,
    pub user_id: Option<Value>,
    pub public_key: Option<Value>,
    pub private_key: Option<Value>,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Option<Value>,
    pub attestation_object: Option<Value>,
    pub authenticator_data: Option<Value>,
    pub algorithm: Option<i64>,
    pub transports: Option<Vec<String>>,
}

/// Build the credential block embedded in a login record's data.
pub(crate) fn build_credential_block(credential_id: &str, fields: &CredentialFields) -> Value {
    let transports: Vec<String> = match &fields.transports {
        Some(t) => t.clone(),
        None => DEFAULT_TRANSPORTS.iter().map(|s| s.to_string()).collect(),
    };

    json!({
        "id": credential_id,
        "rawId": credential_id,
        "type": "public-key",
        "authenticatorAttachment": "platform",
        "clientExtensionResults": { "credProps": { "rk": true } },
        "response": {
            "clientDataJSON": fields.client_data_json,
            "attestationObject": fields.attestation_object,
            "authenticatorData": fields.authenticator_data,
            "publicKey": fields.public_key,
            "publicKeyAlgorithm": fields.algorithm.unwrap_or(DEFAULT_ALGORITHM),
            "transports": transports,
        },
        "_privateKeyBuffer": fields.private_key,
        "_userId": fields.user_id,
    })
}
