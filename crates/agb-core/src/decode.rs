//! Payload decoding for Authentik webhook deliveries

use crate::events::InboundEvent;
use thiserror::Error;

/// Inbound bytes did not conform to the expected payload shape.
///
/// The `Display` text of this error is shown verbatim in the parse-failure
/// notification body, so it has to stay self-contained and human readable.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body was not valid JSON, not valid UTF-8, or not a JSON object.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode a raw webhook body into an [`InboundEvent`].
///
/// Pure function over the input bytes; no side effects.
pub fn decode(bytes: &[u8]) -> Result<InboundEvent, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_payload() {
        let event = decode(br#"{"action": "login_failed", "user": "alice"}"#).unwrap();
        assert_eq!(event.action, "login_failed");
        assert_eq!(event.context["user"], "alice");
    }

    #[test]
    fn test_decode_preserves_action_unmodified() {
        let event = decode(br#"{"action": "Login_Failed "}"#).unwrap();
        assert_eq!(event.action, "Login_Failed ");
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = decode(b"{not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid JSON payload"));
    }

    #[test]
    fn test_decode_rejects_non_object_payload() {
        assert!(decode(b"[1, 2, 3]").is_err());
        assert!(decode(br#""just a string""#).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(decode(&[0x7b, 0xff, 0xfe, 0x7d]).is_err());
    }
}
