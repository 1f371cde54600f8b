//! Scan payload decoding, schema validation, and normalization.
//!
//! Two entry points converge on [`NormalizedScanPayload`]: the encrypted path
//! (decrypt, parse, validate) and the legacy plain-field path. Downstream scan
//! processing sees a single payload shape.

use thiserror::Error;

use shared::crypto::PayloadCipher;

use crate::models::scan::{NormalizedScanPayload, RawScanPayload, ScanAction};

/// Payload decoding/validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Anything that went wrong before a plaintext JSON document existed:
    /// base64, cipher, padding, UTF-8, JSON. Deliberately opaque.
    #[error("payload decryption failed")]
    Decryption,

    /// The plaintext parsed but violates the payload schema.
    #[error("invalid payload: {0}")]
    Schema(String),
}

/// Decrypts and validates an encrypted scan payload.
pub fn decode_encrypted_payload(
    cipher: &PayloadCipher,
    encrypted: &str,
) -> Result<NormalizedScanPayload, PayloadError> {
    let plaintext = cipher
        .decrypt(encrypted)
        .map_err(|_| PayloadError::Decryption)?;
    let raw: RawScanPayload =
        serde_json::from_slice(&plaintext).map_err(|_| PayloadError::Decryption)?;
    validate_raw(raw)
}

/// Normalizes the legacy plain-field scan form.
///
/// Legacy requests carry no `uniqueCode`; replay protection does not apply to
/// them.
pub fn normalize_plain_fields(
    device_id: Option<String>,
    device_type: Option<String>,
    action: Option<String>,
) -> Result<NormalizedScanPayload, PayloadError> {
    validate_raw(RawScanPayload {
        device_id,
        device_type,
        action,
        unique_code: None,
    })
}

/// Serializes and encrypts a payload in the firmware wire shape.
///
/// Counterpart of [`decode_encrypted_payload`], used to mint fixtures and
/// provisioning QR codes.
pub fn encode_payload_for_device(
    cipher: &PayloadCipher,
    device_id: &str,
    device_type: &str,
    action: ScanAction,
    unique_code: Option<i64>,
) -> String {
    let raw = RawScanPayload {
        device_id: Some(device_id.to_string()),
        device_type: Some(device_type.to_string()),
        action: Some(action.as_str().to_string()),
        unique_code: unique_code.map(|c| serde_json::json!(c)),
    };
    let json = serde_json::to_vec(&raw).expect("payload serialization is infallible");
    cipher.encrypt(&json)
}

/// Validates the raw payload schema, failing closed with a specific reason.
fn validate_raw(raw: RawScanPayload) -> Result<NormalizedScanPayload, PayloadError> {
    let device_id = raw
        .device_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PayloadError::Schema("deviceId is required".to_string()))?;

    let device_type = raw
        .device_type
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PayloadError::Schema("type is required".to_string()))?;

    let action_str = raw
        .action
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PayloadError::Schema("action is required".to_string()))?;

    let action = match action_str.as_str() {
        "SCAN" => ScanAction::Scan,
        "REGISTER" => ScanAction::Register,
        other => {
            return Err(PayloadError::Schema(format!(
                "action must be SCAN or REGISTER, got {}",
                other
            )))
        }
    };

    let unique_code = match raw.unique_code {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(
            value
                .as_i64()
                .ok_or_else(|| PayloadError::Schema("uniqueCode must be an integer".to_string()))?,
        ),
    };

    Ok(NormalizedScanPayload {
        device_id,
        device_type,
        action,
        unique_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> PayloadCipher {
        PayloadCipher::from_hex("00112233445566778899aabbccddeeff").unwrap()
    }

    #[test]
    fn test_encrypted_roundtrip() {
        let c = cipher();
        let encoded =
            encode_payload_for_device(&c, "BIN-004", "SMART_BIN", ScanAction::Scan, Some(1001));
        let payload = decode_encrypted_payload(&c, &encoded).unwrap();
        assert_eq!(payload.device_id, "BIN-004");
        assert_eq!(payload.device_type, "SMART_BIN");
        assert_eq!(payload.action, ScanAction::Scan);
        assert_eq!(payload.unique_code, Some(1001));
    }

    #[test]
    fn test_garbage_blob_is_opaque_decryption_error() {
        let c = cipher();
        assert_eq!(
            decode_encrypted_payload(&c, "!!not-base64!!"),
            Err(PayloadError::Decryption)
        );
    }

    #[test]
    fn test_wrong_key_is_opaque_decryption_error() {
        let minting = cipher();
        let serving = PayloadCipher::from_hex("ffeeddccbbaa99887766554433221100").unwrap();
        let encoded =
            encode_payload_for_device(&minting, "BIN-004", "BIN", ScanAction::Scan, Some(1));
        assert_eq!(
            decode_encrypted_payload(&serving, &encoded),
            Err(PayloadError::Decryption)
        );
    }

    #[test]
    fn test_non_json_plaintext_is_decryption_error() {
        let c = cipher();
        let encoded = c.encrypt(b"this is not json");
        assert_eq!(
            decode_encrypted_payload(&c, &encoded),
            Err(PayloadError::Decryption)
        );
    }

    #[test]
    fn test_missing_device_id() {
        let err = normalize_plain_fields(None, Some("BIN".into()), Some("SCAN".into()))
            .unwrap_err();
        assert_eq!(err, PayloadError::Schema("deviceId is required".into()));
    }

    #[test]
    fn test_blank_device_id_rejected() {
        let err = normalize_plain_fields(Some("  ".into()), Some("BIN".into()), Some("SCAN".into()))
            .unwrap_err();
        assert_eq!(err, PayloadError::Schema("deviceId is required".into()));
    }

    #[test]
    fn test_missing_type() {
        let err = normalize_plain_fields(Some("BIN-004".into()), None, Some("SCAN".into()))
            .unwrap_err();
        assert_eq!(err, PayloadError::Schema("type is required".into()));
    }

    #[test]
    fn test_missing_action() {
        let err =
            normalize_plain_fields(Some("BIN-004".into()), Some("BIN".into()), None).unwrap_err();
        assert_eq!(err, PayloadError::Schema("action is required".into()));
    }

    #[test]
    fn test_unknown_action() {
        let err = normalize_plain_fields(
            Some("BIN-004".into()),
            Some("BIN".into()),
            Some("UNLOCK".into()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PayloadError::Schema("action must be SCAN or REGISTER, got UNLOCK".into())
        );
    }

    #[test]
    fn test_register_action_accepted_by_schema() {
        let payload = normalize_plain_fields(
            Some("BIN-004".into()),
            Some("BIN".into()),
            Some("REGISTER".into()),
        )
        .unwrap();
        assert_eq!(payload.action, ScanAction::Register);
    }

    #[test]
    fn test_non_integer_unique_code() {
        let c = cipher();
        let raw = RawScanPayload {
            device_id: Some("BIN-004".into()),
            device_type: Some("BIN".into()),
            action: Some("SCAN".into()),
            unique_code: Some(serde_json::json!("1001")),
        };
        let encoded = c.encrypt(&serde_json::to_vec(&raw).unwrap());
        assert_eq!(
            decode_encrypted_payload(&c, &encoded),
            Err(PayloadError::Schema("uniqueCode must be an integer".into()))
        );
    }

    #[test]
    fn test_fractional_unique_code_rejected() {
        let c = cipher();
        let raw = RawScanPayload {
            device_id: Some("BIN-004".into()),
            device_type: Some("BIN".into()),
            action: Some("SCAN".into()),
            unique_code: Some(serde_json::json!(10.5)),
        };
        let encoded = c.encrypt(&serde_json::to_vec(&raw).unwrap());
        assert_eq!(
            decode_encrypted_payload(&c, &encoded),
            Err(PayloadError::Schema("uniqueCode must be an integer".into()))
        );
    }

    #[test]
    fn test_null_unique_code_treated_as_absent() {
        let c = cipher();
        let raw = RawScanPayload {
            device_id: Some("BIN-004".into()),
            device_type: Some("BIN".into()),
            action: Some("SCAN".into()),
            unique_code: Some(serde_json::Value::Null),
        };
        let encoded = c.encrypt(&serde_json::to_vec(&raw).unwrap());
        let payload = decode_encrypted_payload(&c, &encoded).unwrap();
        assert_eq!(payload.unique_code, None);
    }
}
