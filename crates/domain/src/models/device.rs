//! Device domain model.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::validation::{validate_hardware_id, validate_metadata_value};

/// Device category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    Bin,
    Lamp,
    AccessControl,
    Rfid,
    Generic,
}

impl DeviceType {
    /// Maps a firmware-reported type string onto a registry category.
    ///
    /// Firmware model strings vary per hardware revision (`SMART_BIN`,
    /// `BIN`, ...); anything unrecognized lands in `Generic`.
    pub fn from_wire(value: &str) -> Self {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "BIN" | "SMART_BIN" => DeviceType::Bin,
            "LAMP" | "SMART_LAMP" => DeviceType::Lamp,
            "ACCESS_CONTROL" | "LOCK" | "SMART_LOCK" => DeviceType::AccessControl,
            "RFID" | "RFID_READER" => DeviceType::Rfid,
            _ => DeviceType::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Bin => "BIN",
            DeviceType::Lamp => "LAMP",
            DeviceType::AccessControl => "ACCESS_CONTROL",
            DeviceType::Rfid => "RFID",
            DeviceType::Generic => "GENERIC",
        }
    }

    /// Human-readable label used in activity titles.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::Bin => "smart bin",
            DeviceType::Lamp => "smart lamp",
            DeviceType::AccessControl => "access control",
            DeviceType::Rfid => "RFID reader",
            DeviceType::Generic => "device",
        }
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BIN" => Ok(DeviceType::Bin),
            "LAMP" => Ok(DeviceType::Lamp),
            "ACCESS_CONTROL" => Ok(DeviceType::AccessControl),
            "RFID" => Ok(DeviceType::Rfid),
            "GENERIC" => Ok(DeviceType::Generic),
            _ => Err(format!("Unknown device type: {}", s)),
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Active,
    Inactive,
    Maintenance,
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(DeviceStatus::Active),
            "INACTIVE" => Ok(DeviceStatus::Inactive),
            "MAINTENANCE" => Ok(DeviceStatus::Maintenance),
            _ => Err(format!("Unknown device status: {}", s)),
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::Active => write!(f, "ACTIVE"),
            DeviceStatus::Inactive => write!(f, "INACTIVE"),
            DeviceStatus::Maintenance => write!(f, "MAINTENANCE"),
        }
    }
}

/// Type-specific device metadata: a string-keyed map of scalar values.
///
/// Nested values are rejected at the boundary; typed accessors below are the
/// only way business logic reads type-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceMetadata(BTreeMap<String, serde_json::Value>);

impl DeviceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and adopts a raw metadata map.
    pub fn from_map(
        map: BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, validator::ValidationError> {
        for value in map.values() {
            validate_metadata_value(value)?;
        }
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fill level percentage, reported by bins.
    pub fn fill_percent(&self) -> Option<f64> {
        self.0.get("fillPercent").and_then(|v| v.as_f64())
    }

    /// Brightness percentage, reported by lamps.
    pub fn brightness(&self) -> Option<i64> {
        self.0.get("brightness").and_then(|v| v.as_i64())
    }

    /// Firmware version string, reported by all device kinds.
    pub fn firmware_version(&self) -> Option<&str> {
        self.0.get("firmwareVersion").and_then(|v| v.as_str())
    }
}

/// Represents a registered IoT device.
///
/// The hardware id is globally unique across all workspaces; a device belongs
/// to exactly one workspace at a time. `last_unique_code` is the replay floor:
/// it only ever increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: Uuid,
    pub device_id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub workspace_id: Uuid,
    #[serde(default, skip_serializing_if = "DeviceMetadata::is_empty")]
    pub metadata: DeviceMetadata,
    pub last_unique_code: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for manual device registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    #[validate(custom(function = "validate_hardware_id"))]
    pub device_id: String,

    #[validate(length(
        min = 2,
        max = 50,
        message = "Display name must be between 2 and 50 characters"
    ))]
    pub display_name: String,

    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: DeviceType,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Request payload for device updates.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceRequest {
    #[validate(length(
        min = 2,
        max = 50,
        message = "Display name must be between 2 and 50 characters"
    ))]
    pub display_name: Option<String>,

    pub status: Option<DeviceStatus>,

    #[serde(default)]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

/// Request payload for transferring a device to another workspace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDeviceRequest {
    pub target_workspace_id: Uuid,
}

fn default_device_type() -> DeviceType {
    DeviceType::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_from_wire_known() {
        assert_eq!(DeviceType::from_wire("BIN"), DeviceType::Bin);
        assert_eq!(DeviceType::from_wire("SMART_BIN"), DeviceType::Bin);
        assert_eq!(DeviceType::from_wire("smart_lamp"), DeviceType::Lamp);
        assert_eq!(DeviceType::from_wire("LOCK"), DeviceType::AccessControl);
        assert_eq!(DeviceType::from_wire("RFID_READER"), DeviceType::Rfid);
    }

    #[test]
    fn test_device_type_from_wire_unknown_is_generic() {
        assert_eq!(DeviceType::from_wire("TOASTER"), DeviceType::Generic);
        assert_eq!(DeviceType::from_wire(""), DeviceType::Generic);
    }

    #[test]
    fn test_device_type_roundtrip() {
        for dt in [
            DeviceType::Bin,
            DeviceType::Lamp,
            DeviceType::AccessControl,
            DeviceType::Rfid,
            DeviceType::Generic,
        ] {
            assert_eq!(dt.as_str().parse::<DeviceType>().unwrap(), dt);
        }
    }

    #[test]
    fn test_device_type_serde_wire_names() {
        let json = serde_json::to_string(&DeviceType::AccessControl).unwrap();
        assert_eq!(json, r#""ACCESS_CONTROL""#);
        let parsed: DeviceType = serde_json::from_str(r#""RFID""#).unwrap();
        assert_eq!(parsed, DeviceType::Rfid);
    }

    #[test]
    fn test_device_status_from_str() {
        assert_eq!("ACTIVE".parse::<DeviceStatus>().unwrap(), DeviceStatus::Active);
        assert!("active".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn test_metadata_accessors() {
        let mut map = BTreeMap::new();
        map.insert("fillPercent".to_string(), serde_json::json!(72.5));
        map.insert("brightness".to_string(), serde_json::json!(80));
        map.insert("firmwareVersion".to_string(), serde_json::json!("2.4.1"));
        let meta = DeviceMetadata::from_map(map).unwrap();

        assert_eq!(meta.fill_percent(), Some(72.5));
        assert_eq!(meta.brightness(), Some(80));
        assert_eq!(meta.firmware_version(), Some("2.4.1"));
        assert!(meta.get("missing").is_none());
    }

    #[test]
    fn test_metadata_rejects_nested_values() {
        let mut map = BTreeMap::new();
        map.insert("schedule".to_string(), serde_json::json!({"on": "18:00"}));
        assert!(DeviceMetadata::from_map(map).is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterDeviceRequest {
            device_id: "BIN-004".to_string(),
            display_name: "Lobby bin".to_string(),
            device_type: DeviceType::Bin,
            metadata: BTreeMap::new(),
        };
        assert!(req.validate().is_ok());

        let bad = RegisterDeviceRequest {
            device_id: "!".to_string(),
            display_name: "X".to_string(),
            device_type: DeviceType::Bin,
            metadata: BTreeMap::new(),
        };
        assert!(bad.validate().is_err());
    }
}
