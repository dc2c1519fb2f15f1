use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::{WebhookError, WebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Replay window for webhook timestamps, in seconds.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verifies a `Stripe-Signature` header of the form `t=<unix>,v1=<hex>`.
///
/// The signed payload is `{t}.{body}` keyed with the endpoint secret. The
/// timestamp must fall within the replay window around `now_secs`. The raw
/// body bytes must be used exactly as received; re-serialized JSON will not
/// verify.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => {
                signatures.push(value);
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| WebhookError::InvalidSignature("missing timestamp".to_string()))?;

    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature(
            "missing v1 signature".to_string(),
        ));
    }

    if (now_secs - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(WebhookError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    for candidate in signatures {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| WebhookError::InvalidSignature(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookError::InvalidSignature(
        "signature mismatch".to_string(),
    ))
}

/// Parses the verified payload into a typed event.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}
