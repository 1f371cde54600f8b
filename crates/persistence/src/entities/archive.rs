//! Archive day entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::archive::{ArchiveDay, TimelineBucket};

/// Database row mapping for the activity_archives table.
///
/// The timeline is stored as a JSONB array of buckets.
#[derive(Debug, Clone, FromRow)]
pub struct ArchiveDayEntity {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub day: NaiveDate,
    pub total_points: i64,
    pub total_activities: i64,
    pub active_users: i64,
    pub timeline: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ArchiveDayEntity> for ArchiveDay {
    fn from(entity: ArchiveDayEntity) -> Self {
        let timeline: Vec<TimelineBucket> =
            serde_json::from_value(entity.timeline).unwrap_or_default();
        Self {
            workspace_id: entity.workspace_id,
            day: entity.day,
            total_points: entity.total_points,
            total_activities: entity.total_activities,
            active_users: entity.active_users,
            timeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::activity::ActivityType;
    use domain::models::device::DeviceType;

    #[test]
    fn test_archive_entity_to_domain() {
        let bucket = TimelineBucket {
            hour: 9,
            activity_type: ActivityType::Scan,
            device_type: Some(DeviceType::Bin),
            count: 2,
            points: 20,
            user_ids: vec![Uuid::nil()],
        };
        let entity = ArchiveDayEntity {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            total_points: 20,
            total_activities: 2,
            active_users: 1,
            timeline: serde_json::to_value(vec![bucket.clone()]).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let doc: ArchiveDay = entity.into();
        assert_eq!(doc.timeline, vec![bucket]);
        assert_eq!(doc.active_users, 1);
    }

    #[test]
    fn test_corrupt_timeline_becomes_empty() {
        let entity = ArchiveDayEntity {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            total_points: 0,
            total_activities: 0,
            active_users: 0,
            timeline: serde_json::json!("not an array"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let doc: ArchiveDay = entity.into();
        assert!(doc.timeline.is_empty());
    }
}
