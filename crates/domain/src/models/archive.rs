//! Activity archive model: permanent daily aggregates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::activity::ActivityType;
use super::device::DeviceType;

/// One hour-granularity aggregation bucket inside a day document.
///
/// Key is (hour, type, deviceType); `user_ids` is the set of distinct users
/// contributing to the bucket, kept sorted for deterministic output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBucket {
    pub hour: u32,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    pub count: i64,
    pub points: i64,
    pub user_ids: Vec<Uuid>,
}

/// One archive document per (workspace, UTC calendar day).
///
/// `active_users` is the size of the union of all bucket user-id sets, never
/// the sum of per-bucket counts. Replaced wholesale on recompaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDay {
    pub workspace_id: Uuid,
    pub day: NaiveDate,
    pub total_points: i64,
    pub total_activities: i64,
    pub active_users: i64,
    pub timeline: Vec<TimelineBucket>,
}

/// Admin request to compact an arbitrary `[start, end)` range.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactRequest {
    pub start_date: String,
    pub end_date: String,
}

/// Result of a compaction run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactResponse {
    /// Milliseconds spent compacting.
    pub duration: u64,
    pub days_written: usize,
}

/// Archive stats query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsQuery {
    pub days: i64,
}

/// One day row inside the stats response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub points: i64,
    pub activities: i64,
    pub users: i64,
}

/// Rollup stats across a lookback window of archive days.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStatsResponse {
    pub period: String,
    pub total_points: i64,
    pub total_activities: i64,
    pub unique_users: i64,
    pub daily_breakdown: Vec<DailyBreakdown>,
}

/// Per-type rollup entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdownEntry {
    pub count: i64,
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_bucket_serialization() {
        let bucket = TimelineBucket {
            hour: 14,
            activity_type: ActivityType::Scan,
            device_type: Some(DeviceType::Bin),
            count: 3,
            points: 30,
            user_ids: vec![Uuid::nil()],
        };
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["hour"], 14);
        assert_eq!(json["type"], "SCAN");
        assert_eq!(json["deviceType"], "BIN");
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_timeline_bucket_omits_missing_device_type() {
        let bucket = TimelineBucket {
            hour: 0,
            activity_type: ActivityType::MemberJoined,
            device_type: None,
            count: 1,
            points: 0,
            user_ids: vec![],
        };
        let json = serde_json::to_value(&bucket).unwrap();
        assert!(json.get("deviceType").is_none());
    }

    #[test]
    fn test_archive_day_roundtrip() {
        let day = ArchiveDay {
            workspace_id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            total_points: 100,
            total_activities: 12,
            active_users: 4,
            timeline: vec![],
        };
        let json = serde_json::to_string(&day).unwrap();
        let parsed: ArchiveDay = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, day);
    }
}
