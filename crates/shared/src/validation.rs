//! Common validation utilities.

use chrono::NaiveDate;
use validator::ValidationError;

/// Maximum lookback window for archive queries, in days.
pub const MAX_LOOKBACK_DAYS: i64 = 365;

/// Retention window for raw activity records, in days.
pub const ACTIVITY_RETENTION_DAYS: i64 = 30;

/// Validates a hardware device identifier.
///
/// Hardware ids are assigned by firmware: 2-64 characters, alphanumeric plus
/// hyphens and underscores (e.g. `BIN-004`).
pub fn validate_hardware_id(hardware_id: &str) -> Result<(), ValidationError> {
    let valid_len = (2..=64).contains(&hardware_id.len());
    let valid_chars = hardware_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid_len && valid_chars {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_hardware_id");
        err.message = Some(
            "Device ID must be 2-64 alphanumeric characters, hyphens, or underscores".into(),
        );
        Err(err)
    }
}

/// Validates a lookback window in days (1 to 365 inclusive).
///
/// Out-of-range values are a hard validation error, never silently clamped.
pub fn validate_lookback_days(days: i64) -> Result<(), ValidationError> {
    if (1..=MAX_LOOKBACK_DAYS).contains(&days) {
        Ok(())
    } else {
        let mut err = ValidationError::new("lookback_range");
        err.message = Some(format!("days must be between 1 and {}", MAX_LOOKBACK_DAYS).into());
        Err(err)
    }
}

/// Validates that a half-open `[start, end)` date range is well-formed.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start < end {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_range");
        err.message = Some("startDate must be strictly before endDate".into());
        Err(err)
    }
}

/// Validates a device metadata value: only scalar JSON values are accepted.
///
/// Metadata is a string-keyed map of scalars; nested structures are rejected
/// at the boundary so no untyped blob reaches business logic.
pub fn validate_metadata_value(value: &serde_json::Value) -> Result<(), ValidationError> {
    match value {
        serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Number(_)
        | serde_json::Value::String(_) => Ok(()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            let mut err = ValidationError::new("metadata_scalar");
            err.message = Some("Metadata values must be scalar (string, number, or bool)".into());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardware id tests
    #[test]
    fn test_validate_hardware_id() {
        assert!(validate_hardware_id("BIN-004").is_ok());
        assert!(validate_hardware_id("lamp_12").is_ok());
        assert!(validate_hardware_id("AB").is_ok());
    }

    #[test]
    fn test_validate_hardware_id_too_short() {
        assert!(validate_hardware_id("A").is_err());
        assert!(validate_hardware_id("").is_err());
    }

    #[test]
    fn test_validate_hardware_id_too_long() {
        let long = "X".repeat(65);
        assert!(validate_hardware_id(&long).is_err());
        let max = "X".repeat(64);
        assert!(validate_hardware_id(&max).is_ok());
    }

    #[test]
    fn test_validate_hardware_id_bad_chars() {
        assert!(validate_hardware_id("BIN 004").is_err());
        assert!(validate_hardware_id("BIN#4").is_err());
        assert!(validate_hardware_id("bin/4").is_err());
    }

    #[test]
    fn test_validate_hardware_id_error_message() {
        let err = validate_hardware_id("!").unwrap_err();
        assert!(err.message.unwrap().to_string().contains("Device ID"));
    }

    // Lookback tests
    #[test]
    fn test_validate_lookback_days() {
        assert!(validate_lookback_days(1).is_ok());
        assert!(validate_lookback_days(30).is_ok());
        assert!(validate_lookback_days(365).is_ok());
    }

    #[test]
    fn test_validate_lookback_days_out_of_range() {
        assert!(validate_lookback_days(0).is_err());
        assert!(validate_lookback_days(-1).is_err());
        assert!(validate_lookback_days(366).is_err());
    }

    #[test]
    fn test_validate_lookback_days_error_message() {
        let err = validate_lookback_days(400).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "days must be between 1 and 365"
        );
    }

    // Date range tests
    #[test]
    fn test_validate_date_range() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert!(validate_date_range(start, end).is_ok());
    }

    #[test]
    fn test_validate_date_range_equal() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(validate_date_range(day, day).is_err());
    }

    #[test]
    fn test_validate_date_range_inverted() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(validate_date_range(start, end).is_err());
    }

    // Metadata tests
    #[test]
    fn test_validate_metadata_value_scalars() {
        assert!(validate_metadata_value(&serde_json::json!(null)).is_ok());
        assert!(validate_metadata_value(&serde_json::json!(true)).is_ok());
        assert!(validate_metadata_value(&serde_json::json!(42)).is_ok());
        assert!(validate_metadata_value(&serde_json::json!(0.5)).is_ok());
        assert!(validate_metadata_value(&serde_json::json!("full")).is_ok());
    }

    #[test]
    fn test_validate_metadata_value_rejects_nested() {
        assert!(validate_metadata_value(&serde_json::json!([1, 2])).is_err());
        assert!(validate_metadata_value(&serde_json::json!({"a": 1})).is_err());
    }
}
