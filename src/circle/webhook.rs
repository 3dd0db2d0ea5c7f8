use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::errors::BorderHopError;

type HmacSha256 = Hmac<Sha256>;

/// Status change reported by Circle for one CCTP transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// CCTP transfer id, not the BorderHop id
    pub transfer_id: String,
    pub status: String,
    pub destination_tx_hash: Option<String>,
    pub error: Option<String>,
}

fn string_field(event: &Value, key: &str) -> Option<String> {
    event.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn process_webhook_event(event: &Value) -> Result<WebhookEvent, BorderHopError> {
    let transfer_id = string_field(event, "transferId")
        .ok_or_else(|| BorderHopError::ValidationError("webhook event has no transferId".into()))?;
    let status = string_field(event, "status")
        .ok_or_else(|| BorderHopError::ValidationError("webhook event has no status".into()))?;

    Ok(WebhookEvent {
        transfer_id,
        status,
        destination_tx_hash: string_field(event, "destinationTxHash"),
        error: string_field(event, "error"),
    })
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign_webhook_payload(secret: &str, payload: &[u8]) -> Result<String, BorderHopError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BorderHopError::InternalError(format!("hmac key: {}", e)))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Accepts the bare hex digest or a `sha256=` prefixed one.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let provided = signature.trim();
    let provided = provided.strip_prefix("sha256=").unwrap_or(provided);
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    let expected = mac.finalize().into_bytes();
    expected.as_slice().ct_eq(provided.as_slice()).into()
}
