//! Archive endpoint handlers: stats, type breakdown, and the admin
//! compaction trigger.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use domain::models::archive::{
    ArchiveDay, ArchiveStatsResponse, CompactRequest, CompactResponse, DailyBreakdown, StatsQuery,
    TypeBreakdownEntry,
};
use persistence::repositories::{ArchiveRepository, MembershipRepository};
use shared::validation::{validate_date_range, validate_lookback_days};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;
use crate::services::CompactionService;

/// Archive rollup stats over a lookback window.
///
/// GET /api/v1/workspaces/:workspace_id/archive/stats?days=N
pub async fn archive_stats(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ArchiveStatsResponse>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;
    validate_lookback_days(query.days).map_err(|e| {
        ApiError::Validation(e.message.map(|m| m.to_string()).unwrap_or_default())
    })?;

    let documents = load_range(&state, workspace_id, query.days).await?;

    let total_points: i64 = documents.iter().map(|d| d.total_points).sum();
    let total_activities: i64 = documents.iter().map(|d| d.total_activities).sum();

    // Unique users across the whole window: union over every bucket of every
    // day, de-duplicated across days rather than summed per day.
    let unique: BTreeSet<Uuid> = documents
        .iter()
        .flat_map(|d| d.timeline.iter())
        .flat_map(|b| b.user_ids.iter().copied())
        .collect();

    let daily_breakdown = documents
        .iter()
        .map(|d| DailyBreakdown {
            date: d.day,
            points: d.total_points,
            activities: d.total_activities,
            users: d.active_users,
        })
        .collect();

    Ok(Json(ArchiveStatsResponse {
        period: format!("{}d", query.days),
        total_points,
        total_activities,
        unique_users: unique.len() as i64,
        daily_breakdown,
    }))
}

/// Per-type breakdown over a lookback window.
///
/// GET /api/v1/workspaces/:workspace_id/archive/types?days=N
pub async fn archive_type_breakdown(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<BTreeMap<String, TypeBreakdownEntry>>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;
    validate_lookback_days(query.days).map_err(|e| {
        ApiError::Validation(e.message.map(|m| m.to_string()).unwrap_or_default())
    })?;

    let documents = load_range(&state, workspace_id, query.days).await?;

    let mut breakdown: BTreeMap<String, TypeBreakdownEntry> = BTreeMap::new();
    for bucket in documents.iter().flat_map(|d| d.timeline.iter()) {
        let entry = breakdown
            .entry(bucket.activity_type.as_str().to_string())
            .or_default();
        entry.count += bucket.count;
        entry.points += bucket.points;
    }

    Ok(Json(breakdown))
}

/// Operator-triggered compaction of an arbitrary `[start, end)` range.
///
/// POST /api/v1/admin/archive/compact {"startDate": "...", "endDate": "..."}
///
/// Re-running a range is safe: day documents are derived purely from the raw
/// data and replaced wholesale.
pub async fn trigger_compaction(
    State(state): State<AppState>,
    Json(request): Json<CompactRequest>,
) -> Result<Json<CompactResponse>, ApiError> {
    let start_date = parse_date(&request.start_date, "startDate")?;
    let end_date = parse_date(&request.end_date, "endDate")?;
    validate_date_range(start_date, end_date).map_err(|e| {
        ApiError::Validation(e.message.map(|m| m.to_string()).unwrap_or_default())
    })?;

    let start = start_date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    let end = end_date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();

    let outcome = CompactionService::new(state.pool.clone())
        .compact(start, end)
        .await?;

    info!(
        start = %start,
        end = %end,
        days_written = outcome.days_written,
        "manual compaction triggered"
    );

    Ok(Json(CompactResponse {
        duration: outcome.duration_ms,
        days_written: outcome.days_written,
    }))
}

async fn load_range(
    state: &AppState,
    workspace_id: Uuid,
    days: i64,
) -> Result<Vec<ArchiveDay>, ApiError> {
    let today = Utc::now().date_naive();
    let from = today - Duration::days(days - 1);
    let archives = ArchiveRepository::new(state.pool.clone());
    let entities = archives.find_range(workspace_id, from, today).await?;
    Ok(entities.into_iter().map(ArchiveDay::from).collect())
}

async fn require_member(
    state: &AppState,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let memberships = MembershipRepository::new(state.pool.clone());
    if memberships.is_member(workspace_id, user_id).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You are not a member of this workspace".to_string(),
        ))
    }
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ApiError> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| ApiError::Validation(format!("{} must be an ISO date (YYYY-MM-DD)", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_iso() {
        assert_eq!(
            parse_date("2024-06-01", "startDate").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("01/06/2024", "startDate").is_err());
        assert!(parse_date("yesterday", "startDate").is_err());
        assert!(parse_date("2024-13-01", "startDate").is_err());
    }
}
