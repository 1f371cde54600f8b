//! Activity entity (database row mapping) and aggregation row shapes.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::activity::ActivityType;
use domain::models::device::DeviceType;
use domain::services::compaction::RawEvent;
use domain::services::graph::{SlotRow, TypeRow};

/// Database row mapping for the activities table.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityEntity {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
    pub device_type: Option<String>,
    pub activity_type: String,
    pub title: String,
    pub description: String,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityEntity> for domain::models::Activity {
    fn from(entity: ActivityEntity) -> Self {
        Self {
            id: entity.id,
            workspace_id: entity.workspace_id,
            user_id: entity.user_id,
            device_id: entity.device_id,
            device_type: entity
                .device_type
                .as_deref()
                .and_then(|t| t.parse::<DeviceType>().ok()),
            activity_type: entity
                .activity_type
                .parse::<ActivityType>()
                .unwrap_or(ActivityType::Generic),
            title: entity.title,
            description: entity.description,
            points: entity.points,
            created_at: entity.created_at,
        }
    }
}

impl From<ActivityEntity> for RawEvent {
    fn from(entity: ActivityEntity) -> Self {
        Self {
            workspace_id: entity.workspace_id,
            user_id: entity.user_id,
            device_type: entity
                .device_type
                .as_deref()
                .and_then(|t| t.parse::<DeviceType>().ok()),
            activity_type: entity
                .activity_type
                .parse::<ActivityType>()
                .unwrap_or(ActivityType::Generic),
            points: entity.points as i64,
            created_at: entity.created_at,
        }
    }
}

/// GROUP BY hour-of-day aggregation row.
#[derive(Debug, Clone, FromRow)]
pub struct HourSlotEntity {
    pub hour: i32,
    pub count: i64,
    pub points: i64,
}

impl From<HourSlotEntity> for SlotRow {
    fn from(entity: HourSlotEntity) -> Self {
        Self {
            hour: Some(entity.hour.clamp(0, 23) as u32),
            day: None,
            count: entity.count,
            points: entity.points,
        }
    }
}

/// GROUP BY calendar-day aggregation row.
#[derive(Debug, Clone, FromRow)]
pub struct DaySlotEntity {
    pub day: NaiveDate,
    pub count: i64,
    pub points: i64,
}

impl From<DaySlotEntity> for SlotRow {
    fn from(entity: DaySlotEntity) -> Self {
        Self {
            hour: None,
            day: Some(entity.day),
            count: entity.count,
            points: entity.points,
        }
    }
}

/// GROUP BY activity-type aggregation row.
#[derive(Debug, Clone, FromRow)]
pub struct TypeSlotEntity {
    pub activity_type: String,
    pub count: i64,
    pub points: i64,
}

impl From<TypeSlotEntity> for TypeRow {
    fn from(entity: TypeSlotEntity) -> Self {
        Self {
            activity_type: entity
                .activity_type
                .parse::<ActivityType>()
                .unwrap_or(ActivityType::Generic),
            count: entity.count,
            points: entity.points,
        }
    }
}
