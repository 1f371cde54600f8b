//! Scan request/response wire shapes and the normalized payload.

use serde::{Deserialize, Serialize};

use super::activity::ActivitySummary;

/// Action carried by a QR payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanAction {
    Scan,
    Register,
}

impl ScanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanAction::Scan => "SCAN",
            ScanAction::Register => "REGISTER",
        }
    }
}

/// Decrypted payload wire shape, exactly as device firmware emits it.
///
/// All fields are optional at this level so that schema validation can name
/// the specific missing/invalid field. `uniqueCode` stays a raw JSON value
/// until validated to be an integer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScanPayload {
    pub device_id: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<serde_json::Value>,
}

/// Validated payload: the single internal shape both the encrypted and the
/// legacy plain scan paths converge on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedScanPayload {
    pub device_id: String,
    pub device_type: String,
    pub action: ScanAction,
    pub unique_code: Option<i64>,
}

/// Workspace-scoped scan request: either the encrypted form or the legacy
/// plain form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub encrypted_payload: Option<String>,
    pub device_id: Option<String>,
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
}

/// Workspace-agnostic scan request: encrypted form only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalScanRequest {
    pub encrypted_payload: String,
}

/// Successful scan response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub points_earned: i32,
    pub workspace_points: i64,
    pub total_points: i64,
    pub scan_count: i64,
    pub activity: ActivitySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_payload_parses_firmware_json() {
        let raw: RawScanPayload = serde_json::from_str(
            r#"{"deviceId":"BIN-004","type":"SMART_BIN","action":"SCAN","uniqueCode":1001}"#,
        )
        .unwrap();
        assert_eq!(raw.device_id.as_deref(), Some("BIN-004"));
        assert_eq!(raw.device_type.as_deref(), Some("SMART_BIN"));
        assert_eq!(raw.action.as_deref(), Some("SCAN"));
        assert_eq!(raw.unique_code, Some(serde_json::json!(1001)));
    }

    #[test]
    fn test_raw_payload_tolerates_missing_fields() {
        let raw: RawScanPayload = serde_json::from_str(r#"{"deviceId":"X-1"}"#).unwrap();
        assert!(raw.action.is_none());
        assert!(raw.unique_code.is_none());
    }

    #[test]
    fn test_scan_request_legacy_plain_form() {
        let req: ScanRequest =
            serde_json::from_str(r#"{"deviceId":"BIN-004","action":"SCAN","type":"BIN"}"#).unwrap();
        assert!(req.encrypted_payload.is_none());
        assert_eq!(req.device_id.as_deref(), Some("BIN-004"));
    }
}
