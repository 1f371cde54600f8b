//! Activity graph assembly: zero-filled hour/day series over the raw log.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::ActivityType;

/// Requested graph window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphRange {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
}

impl GraphRange {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(GraphRange::Today),
            "yesterday" => Some(GraphRange::Yesterday),
            "7days" => Some(GraphRange::SevenDays),
            "30days" => Some(GraphRange::ThirtyDays),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GraphRange::Today => "today",
            GraphRange::Yesterday => "yesterday",
            GraphRange::SevenDays => "7days",
            GraphRange::ThirtyDays => "30days",
        }
    }

    /// Grouping granularity for this range.
    pub fn group_by(&self) -> GroupBy {
        match self {
            GraphRange::Today | GraphRange::Yesterday => GroupBy::Hour,
            GraphRange::SevenDays | GraphRange::ThirtyDays => GroupBy::Day,
        }
    }

    /// Half-open `[start, end)` window for this range, relative to `now`.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        match self {
            GraphRange::Today => (midnight, midnight + Duration::days(1)),
            GraphRange::Yesterday => (midnight - Duration::days(1), midnight),
            GraphRange::SevenDays => (midnight - Duration::days(6), midnight + Duration::days(1)),
            GraphRange::ThirtyDays => {
                (midnight - Duration::days(29), midnight + Duration::days(1))
            }
        }
    }
}

/// Slot granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Hour,
    Day,
}

/// An aggregated slot-key row produced by the store's GROUP BY query.
#[derive(Debug, Clone)]
pub struct SlotRow {
    /// Hour of day (0-23) for hourly ranges, offset irrelevant; calendar day
    /// for daily ranges.
    pub hour: Option<u32>,
    pub day: Option<NaiveDate>,
    pub count: i64,
    pub points: i64,
}

/// Per-type aggregation row.
#[derive(Debug, Clone)]
pub struct TypeRow {
    pub activity_type: ActivityType,
    pub count: i64,
    pub points: i64,
}

/// One point in the rendered series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDataPoint {
    pub label: String,
    pub count: i64,
    pub points: i64,
}

/// Series totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphTotals {
    pub count: i64,
    pub points: i64,
}

/// Per-type breakdown entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphTypeEntry {
    pub count: i64,
    pub points: i64,
}

/// Fully assembled graph response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphResponse {
    pub range: GraphRange,
    pub group_by: GroupBy,
    pub data_points: Vec<GraphDataPoint>,
    pub totals: GraphTotals,
    pub type_breakdown: BTreeMap<String, GraphTypeEntry>,
}

/// Assembles a graph response from aggregated slot rows.
///
/// Every slot in range appears in the output even with zero activity: 24
/// hour slots for today/yesterday, one slot per calendar day otherwise.
pub fn build_graph(
    range: GraphRange,
    now: DateTime<Utc>,
    slot_rows: Vec<SlotRow>,
    type_rows: Vec<TypeRow>,
) -> GraphResponse {
    let group_by = range.group_by();

    let data_points = match group_by {
        GroupBy::Hour => {
            let mut by_hour: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
            for row in slot_rows {
                if let Some(hour) = row.hour {
                    let entry = by_hour.entry(hour).or_default();
                    entry.0 += row.count;
                    entry.1 += row.points;
                }
            }
            (0..24)
                .map(|hour| {
                    let (count, points) = by_hour.get(&hour).copied().unwrap_or((0, 0));
                    GraphDataPoint {
                        label: format!("{:02}:00", hour),
                        count,
                        points,
                    }
                })
                .collect()
        }
        GroupBy::Day => {
            let mut by_day: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
            for row in slot_rows {
                if let Some(day) = row.day {
                    let entry = by_day.entry(day).or_default();
                    entry.0 += row.count;
                    entry.1 += row.points;
                }
            }
            let (start, end) = range.window(now);
            let mut day = start.date_naive();
            let last = (end - Duration::days(1)).date_naive();
            let mut points_out = Vec::new();
            while day <= last {
                let (count, points) = by_day.get(&day).copied().unwrap_or((0, 0));
                points_out.push(GraphDataPoint {
                    label: day.format("%Y-%m-%d").to_string(),
                    count,
                    points,
                });
                day += Duration::days(1);
            }
            points_out
        }
    };

    let totals = GraphTotals {
        count: data_points.iter().map(|p| p.count).sum(),
        points: data_points.iter().map(|p| p.points).sum(),
    };

    let type_breakdown = type_rows
        .into_iter()
        .map(|row| {
            (
                row.activity_type.as_str().to_string(),
                GraphTypeEntry {
                    count: row.count,
                    points: row.points,
                },
            )
        })
        .collect();

    GraphResponse {
        range,
        group_by,
        data_points,
        totals,
        type_breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 13, 45, 0).unwrap()
    }

    #[test]
    fn test_range_parse() {
        assert_eq!(GraphRange::parse("today"), Some(GraphRange::Today));
        assert_eq!(GraphRange::parse("7days"), Some(GraphRange::SevenDays));
        assert_eq!(GraphRange::parse("last_week"), None);
    }

    #[test]
    fn test_today_window() {
        let (start, end) = GraphRange::Today.window(now());
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_yesterday_window() {
        let (start, end) = GraphRange::Yesterday.window(now());
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_empty_today_graph_has_24_zero_slots() {
        let graph = build_graph(GraphRange::Today, now(), vec![], vec![]);
        assert_eq!(graph.data_points.len(), 24);
        assert!(graph
            .data_points
            .iter()
            .all(|p| p.count == 0 && p.points == 0));
        assert_eq!(graph.totals, GraphTotals::default());
        assert_eq!(graph.data_points[0].label, "00:00");
        assert_eq!(graph.data_points[23].label, "23:00");
    }

    #[test]
    fn test_hourly_slots_filled_from_rows() {
        let rows = vec![
            SlotRow {
                hour: Some(9),
                day: None,
                count: 3,
                points: 30,
            },
            SlotRow {
                hour: Some(17),
                day: None,
                count: 1,
                points: 10,
            },
        ];
        let graph = build_graph(GraphRange::Today, now(), rows, vec![]);
        assert_eq!(graph.data_points[9].count, 3);
        assert_eq!(graph.data_points[17].points, 10);
        assert_eq!(graph.totals.count, 4);
        assert_eq!(graph.totals.points, 40);
    }

    #[test]
    fn test_seven_day_graph_has_7_slots_ending_today() {
        let graph = build_graph(GraphRange::SevenDays, now(), vec![], vec![]);
        assert_eq!(graph.data_points.len(), 7);
        assert_eq!(graph.data_points[0].label, "2024-06-09");
        assert_eq!(graph.data_points[6].label, "2024-06-15");
    }

    #[test]
    fn test_thirty_day_graph_has_30_slots() {
        let graph = build_graph(GraphRange::ThirtyDays, now(), vec![], vec![]);
        assert_eq!(graph.data_points.len(), 30);
        assert_eq!(graph.data_points[29].label, "2024-06-15");
    }

    #[test]
    fn test_daily_slots_filled_from_rows() {
        let rows = vec![SlotRow {
            hour: None,
            day: NaiveDate::from_ymd_opt(2024, 6, 12),
            count: 5,
            points: 50,
        }];
        let graph = build_graph(GraphRange::SevenDays, now(), rows, vec![]);
        let slot = graph
            .data_points
            .iter()
            .find(|p| p.label == "2024-06-12")
            .unwrap();
        assert_eq!(slot.count, 5);
        assert_eq!(slot.points, 50);
    }

    #[test]
    fn test_type_breakdown() {
        let types = vec![
            TypeRow {
                activity_type: ActivityType::Scan,
                count: 4,
                points: 40,
            },
            TypeRow {
                activity_type: ActivityType::Reward,
                count: 1,
                points: 25,
            },
        ];
        let graph = build_graph(GraphRange::Today, now(), vec![], types);
        assert_eq!(graph.type_breakdown["SCAN"].count, 4);
        assert_eq!(graph.type_breakdown["REWARD"].points, 25);
    }
}
