//! Device entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::device::{DeviceMetadata, DeviceStatus, DeviceType};

/// Database row mapping for the devices table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceEntity {
    pub id: Uuid,
    pub device_id: String,
    pub display_name: String,
    pub device_type: String,
    pub status: String,
    pub workspace_id: Uuid,
    pub metadata: serde_json::Value,
    pub last_unique_code: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeviceEntity> for domain::models::Device {
    fn from(entity: DeviceEntity) -> Self {
        let metadata = serde_json::from_value::<DeviceMetadata>(entity.metadata)
            .unwrap_or_default();
        Self {
            id: entity.id,
            device_id: entity.device_id,
            display_name: entity.display_name,
            device_type: entity
                .device_type
                .parse::<DeviceType>()
                .unwrap_or(DeviceType::Generic),
            status: entity
                .status
                .parse::<DeviceStatus>()
                .unwrap_or(DeviceStatus::Inactive),
            workspace_id: entity.workspace_id,
            metadata,
            last_unique_code: entity.last_unique_code,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_device_entity() -> DeviceEntity {
        DeviceEntity {
            id: Uuid::new_v4(),
            device_id: "BIN-004".to_string(),
            display_name: "Lobby bin".to_string(),
            device_type: "BIN".to_string(),
            status: "ACTIVE".to_string(),
            workspace_id: Uuid::new_v4(),
            metadata: serde_json::json!({"fillPercent": 40.0}),
            last_unique_code: 1000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_device_entity_to_domain() {
        let entity = create_test_device_entity();
        let device: domain::models::Device = entity.clone().into();

        assert_eq!(device.id, entity.id);
        assert_eq!(device.device_id, "BIN-004");
        assert_eq!(device.device_type, DeviceType::Bin);
        assert_eq!(device.status, DeviceStatus::Active);
        assert_eq!(device.last_unique_code, 1000);
        assert_eq!(device.metadata.fill_percent(), Some(40.0));
    }

    #[test]
    fn test_unknown_type_falls_back_to_generic() {
        let mut entity = create_test_device_entity();
        entity.device_type = "LEGACY_KIND".to_string();
        let device: domain::models::Device = entity.into();
        assert_eq!(device.device_type, DeviceType::Generic);
    }

    #[test]
    fn test_malformed_metadata_becomes_empty() {
        let mut entity = create_test_device_entity();
        entity.metadata = serde_json::json!([1, 2, 3]);
        let device: domain::models::Device = entity.into();
        assert!(device.metadata.is_empty());
    }
}
