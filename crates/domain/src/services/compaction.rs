//! The two-stage compaction grouping pipeline.
//!
//! Stage one folds raw activity events into hour buckets keyed by
//! (workspace, type, deviceType, UTC day, hour). Stage two regroups the
//! buckets into one document per (workspace, day), where the daily
//! distinct-user count is the size of the union of the per-bucket user sets.
//!
//! Grouping is a pure function of the events passed in: given the same raw
//! data it produces identical documents, which is what makes the archive
//! upsert idempotent. All intermediate maps are ordered so the output is
//! deterministic down to element order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use uuid::Uuid;

use crate::models::activity::ActivityType;
use crate::models::archive::{ArchiveDay, TimelineBucket};
use crate::models::device::DeviceType;

/// Projection of a raw activity record carrying exactly what compaction needs.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub device_type: Option<DeviceType>,
    pub activity_type: ActivityType,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct HourKey {
    workspace_id: Uuid,
    day: NaiveDate,
    hour: u32,
    activity_type: ActivityType,
    device_type: Option<DeviceType>,
}

#[derive(Debug, Default)]
struct BucketAcc {
    count: i64,
    points: i64,
    users: BTreeSet<Uuid>,
}

/// Runs both grouping stages and returns the day documents, ordered by
/// (workspace, day).
pub fn build_day_documents(events: impl IntoIterator<Item = RawEvent>) -> Vec<ArchiveDay> {
    // Stage 1: hour buckets.
    let mut buckets: BTreeMap<HourKey, BucketAcc> = BTreeMap::new();
    for event in events {
        let key = HourKey {
            workspace_id: event.workspace_id,
            day: event.created_at.date_naive(),
            hour: event.created_at.hour(),
            activity_type: event.activity_type,
            device_type: event.device_type,
        };
        let acc = buckets.entry(key).or_default();
        acc.count += 1;
        acc.points += event.points;
        acc.users.insert(event.user_id);
    }

    // Stage 2: regroup hour buckets into day documents.
    let mut days: BTreeMap<(Uuid, NaiveDate), ArchiveDay> = BTreeMap::new();
    for (key, acc) in buckets {
        let doc = days
            .entry((key.workspace_id, key.day))
            .or_insert_with(|| ArchiveDay {
                workspace_id: key.workspace_id,
                day: key.day,
                total_points: 0,
                total_activities: 0,
                active_users: 0,
                timeline: Vec::new(),
            });
        doc.total_points += acc.points;
        doc.total_activities += acc.count;
        doc.timeline.push(TimelineBucket {
            hour: key.hour,
            activity_type: key.activity_type,
            device_type: key.device_type,
            count: acc.count,
            points: acc.points,
            user_ids: acc.users.into_iter().collect(),
        });
    }

    // Daily distinct users: union across buckets, not a sum of bucket counts.
    let mut documents: Vec<ArchiveDay> = days.into_values().collect();
    for doc in &mut documents {
        let union: BTreeSet<Uuid> = doc
            .timeline
            .iter()
            .flat_map(|bucket| bucket.user_ids.iter().copied())
            .collect();
        doc.active_users = union.len() as i64;
    }
    documents
}

/// Computes the `[yesterday 00:00 UTC, today 00:00 UTC)` window.
pub fn yesterday_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    let yesterday = today - chrono::Duration::days(1);
    (yesterday, today)
}

/// True if `ts` falls inside the half-open `[start, end)` window.
pub fn in_window(ts: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    ts >= start && ts < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ws(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn user(n: u128) -> Uuid {
        Uuid::from_u128(0xA000 + n)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 15, 0).unwrap()
    }

    fn scan_event(workspace: Uuid, u: Uuid, day: u32, hour: u32) -> RawEvent {
        RawEvent {
            workspace_id: workspace,
            user_id: u,
            device_type: Some(DeviceType::Bin),
            activity_type: ActivityType::Scan,
            points: 10,
            created_at: at(day, hour),
        }
    }

    #[test]
    fn test_empty_input_produces_no_documents() {
        assert!(build_day_documents(vec![]).is_empty());
    }

    #[test]
    fn test_single_event_single_bucket() {
        let docs = build_day_documents(vec![scan_event(ws(1), user(1), 1, 9)]);
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.total_points, 10);
        assert_eq!(doc.total_activities, 1);
        assert_eq!(doc.active_users, 1);
        assert_eq!(doc.timeline.len(), 1);
        assert_eq!(doc.timeline[0].hour, 9);
        assert_eq!(doc.timeline[0].count, 1);
        assert_eq!(doc.timeline[0].points, 10);
    }

    #[test]
    fn test_same_bucket_accumulates() {
        let docs = build_day_documents(vec![
            scan_event(ws(1), user(1), 1, 9),
            scan_event(ws(1), user(2), 1, 9),
            scan_event(ws(1), user(1), 1, 9),
        ]);
        assert_eq!(docs[0].timeline.len(), 1);
        assert_eq!(docs[0].timeline[0].count, 3);
        assert_eq!(docs[0].timeline[0].points, 30);
        assert_eq!(docs[0].timeline[0].user_ids.len(), 2);
    }

    #[test]
    fn test_bucket_splits_on_type_and_device_type() {
        let mut member_event = scan_event(ws(1), user(1), 1, 9);
        member_event.activity_type = ActivityType::MemberJoined;
        member_event.device_type = None;
        member_event.points = 0;

        let mut lamp_event = scan_event(ws(1), user(1), 1, 9);
        lamp_event.device_type = Some(DeviceType::Lamp);

        let docs = build_day_documents(vec![
            scan_event(ws(1), user(1), 1, 9),
            lamp_event,
            member_event,
        ]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].timeline.len(), 3);
    }

    #[test]
    fn test_union_not_sum_for_daily_users() {
        // One user active in hour 3 and hour 15 counts once for the day.
        let docs = build_day_documents(vec![
            scan_event(ws(1), user(7), 1, 3),
            scan_event(ws(1), user(7), 1, 15),
        ]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].timeline.len(), 2);
        assert_eq!(docs[0].active_users, 1);
        assert_eq!(docs[0].total_activities, 2);
    }

    #[test]
    fn test_union_across_types_same_day() {
        let mut reward = scan_event(ws(1), user(7), 1, 3);
        reward.activity_type = ActivityType::Reward;
        reward.device_type = None;

        let docs = build_day_documents(vec![scan_event(ws(1), user(7), 1, 3), reward]);
        assert_eq!(docs[0].active_users, 1);
    }

    #[test]
    fn test_workspaces_do_not_mix() {
        let docs = build_day_documents(vec![
            scan_event(ws(1), user(1), 1, 9),
            scan_event(ws(2), user(1), 1, 9),
        ]);
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.total_activities == 1));
    }

    #[test]
    fn test_days_split_at_utc_midnight() {
        let docs = build_day_documents(vec![
            scan_event(ws(1), user(1), 1, 23),
            scan_event(ws(1), user(1), 2, 0),
        ]);
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_deterministic_output() {
        let events = vec![
            scan_event(ws(2), user(3), 1, 5),
            scan_event(ws(1), user(1), 1, 9),
            scan_event(ws(1), user(2), 1, 9),
            scan_event(ws(1), user(1), 2, 0),
        ];
        let mut reversed = events.clone();
        reversed.reverse();

        let a = build_day_documents(events);
        let b = build_day_documents(reversed);
        assert_eq!(a, b);

        // Byte-for-byte identical serialization, the idempotency contract.
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_user_ids_sorted_within_bucket() {
        let docs = build_day_documents(vec![
            scan_event(ws(1), user(9), 1, 9),
            scan_event(ws(1), user(2), 1, 9),
            scan_event(ws(1), user(5), 1, 9),
        ]);
        let ids = &docs[0].timeline[0].user_ids;
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(*ids, sorted);
    }

    #[test]
    fn test_yesterday_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 30, 0).unwrap();
        let (start, end) = yesterday_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_in_window_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        assert!(in_window(start, start, end));
        assert!(!in_window(end, start, end));
    }
}
