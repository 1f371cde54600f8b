//! Activity domain model: the raw per-event log.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device::DeviceType;

/// Kind of workspace activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Scan,
    DeviceAdded,
    DeviceRemoved,
    DeviceTransferredOut,
    DeviceTransferredIn,
    MemberJoined,
    MemberLeft,
    Achievement,
    Reward,
    Generic,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Scan => "SCAN",
            ActivityType::DeviceAdded => "DEVICE_ADDED",
            ActivityType::DeviceRemoved => "DEVICE_REMOVED",
            ActivityType::DeviceTransferredOut => "DEVICE_TRANSFERRED_OUT",
            ActivityType::DeviceTransferredIn => "DEVICE_TRANSFERRED_IN",
            ActivityType::MemberJoined => "MEMBER_JOINED",
            ActivityType::MemberLeft => "MEMBER_LEFT",
            ActivityType::Achievement => "ACHIEVEMENT",
            ActivityType::Reward => "REWARD",
            ActivityType::Generic => "GENERIC",
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCAN" => Ok(ActivityType::Scan),
            "DEVICE_ADDED" => Ok(ActivityType::DeviceAdded),
            "DEVICE_REMOVED" => Ok(ActivityType::DeviceRemoved),
            "DEVICE_TRANSFERRED_OUT" => Ok(ActivityType::DeviceTransferredOut),
            "DEVICE_TRANSFERRED_IN" => Ok(ActivityType::DeviceTransferredIn),
            "MEMBER_JOINED" => Ok(ActivityType::MemberJoined),
            "MEMBER_LEFT" => Ok(ActivityType::MemberLeft),
            "ACHIEVEMENT" => Ok(ActivityType::Achievement),
            "REWARD" => Ok(ActivityType::Reward),
            "GENERIC" => Ok(ActivityType::Generic),
            _ => Err(format!("Unknown activity type: {}", s)),
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw activity record. Immutable once created; purged 30 days after
/// creation by the retention job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    pub description: String,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a new activity record.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
    pub device_type: Option<DeviceType>,
    pub activity_type: ActivityType,
    pub title: String,
    pub description: String,
    pub points: i32,
}

/// Compact activity echo returned from the scan endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Activity> for ActivitySummary {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            activity_type: activity.activity_type,
            title: activity.title,
            timestamp: activity.created_at,
        }
    }
}

/// Query parameters for the incremental activity sync endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListQuery {
    /// Only activities strictly newer than this are returned. When absent,
    /// the caller's membership join date is the lower bound.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_roundtrip() {
        for t in [
            ActivityType::Scan,
            ActivityType::DeviceAdded,
            ActivityType::DeviceRemoved,
            ActivityType::DeviceTransferredOut,
            ActivityType::DeviceTransferredIn,
            ActivityType::MemberJoined,
            ActivityType::MemberLeft,
            ActivityType::Achievement,
            ActivityType::Reward,
            ActivityType::Generic,
        ] {
            assert_eq!(t.as_str().parse::<ActivityType>().unwrap(), t);
        }
    }

    #[test]
    fn test_activity_type_wire_names() {
        let json = serde_json::to_string(&ActivityType::DeviceTransferredOut).unwrap();
        assert_eq!(json, r#""DEVICE_TRANSFERRED_OUT""#);
    }

    #[test]
    fn test_activity_summary_from_activity() {
        let activity = Activity {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            device_id: Some(Uuid::new_v4()),
            device_type: Some(DeviceType::Bin),
            activity_type: ActivityType::Scan,
            title: "Scanned Lobby bin".to_string(),
            description: "Earned 10 points".to_string(),
            points: 10,
            created_at: Utc::now(),
        };
        let summary: ActivitySummary = activity.clone().into();
        assert_eq!(summary.id, activity.id);
        assert_eq!(summary.activity_type, ActivityType::Scan);
        assert_eq!(summary.title, activity.title);
        assert_eq!(summary.timestamp, activity.created_at);
    }
}
