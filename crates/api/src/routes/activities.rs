//! Activity endpoint handlers: incremental sync and graphs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain::models::activity::{Activity, ActivityListQuery, ActivityType};
use domain::services::graph::{build_graph, GraphRange, GraphResponse};
use persistence::repositories::{ActivityRepository, MembershipRepository};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListResponse {
    pub activities: Vec<Activity>,
}

/// Incremental activity sync.
///
/// GET /api/v1/workspaces/:workspace_id/activities?since=..&limit=..
///
/// Without a `since` cursor, the caller's membership join date bounds the
/// window: a member never sees activity predating their membership on first
/// sync. Records older than 30 days have been purged; historical questions
/// belong to the archive endpoints.
pub async fn list_activities(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<ActivityListResponse>, ApiError> {
    let memberships = MembershipRepository::new(state.pool.clone());
    let membership = memberships
        .find_active(workspace_id, caller.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden("You are not a member of this workspace".to_string())
        })?;

    let since = query.since.unwrap_or(membership.joined_date);
    let limit = query
        .limit
        .unwrap_or(state.config.limits.activity_page_size)
        .clamp(1, state.config.limits.activity_max_page_size);

    let activities = ActivityRepository::new(state.pool.clone());
    let entities = activities.list_since(workspace_id, since, limit).await?;

    Ok(Json(ActivityListResponse {
        activities: entities.into_iter().map(Activity::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    pub range: String,
    /// Comma-separated activity type filter.
    pub types: Option<String>,
}

/// Activity graph.
///
/// GET /api/v1/workspaces/:workspace_id/activities/graph?range=today&types=SCAN,REWARD
///
/// today/yesterday group by hour-of-day (24 slots); 7days/30days group by
/// calendar day. Every slot in range is present even with zero activity.
pub async fn activity_graph(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<GraphResponse>, ApiError> {
    let memberships = MembershipRepository::new(state.pool.clone());
    if !memberships.is_member(workspace_id, caller.user_id).await? {
        return Err(ApiError::Forbidden(
            "You are not a member of this workspace".to_string(),
        ));
    }

    let range = GraphRange::parse(&query.range).ok_or_else(|| {
        ApiError::Validation(
            "range must be one of today, yesterday, 7days, 30days".to_string(),
        )
    })?;

    let types = parse_type_filter(query.types.as_deref())?;

    let now = Utc::now();
    let (start, end) = range.window(now);
    let activities = ActivityRepository::new(state.pool.clone());

    let slot_rows = match range {
        GraphRange::Today | GraphRange::Yesterday => activities
            .aggregate_by_hour(workspace_id, start, end, types.as_deref())
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
        GraphRange::SevenDays | GraphRange::ThirtyDays => activities
            .aggregate_by_day(workspace_id, start, end, types.as_deref())
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    };

    let type_rows = activities
        .aggregate_by_type(workspace_id, start, end)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(build_graph(range, now, slot_rows, type_rows)))
}

/// Parses and validates a comma-separated activity type list.
fn parse_type_filter(types: Option<&str>) -> Result<Option<Vec<String>>, ApiError> {
    let Some(raw) = types else {
        return Ok(None);
    };
    let mut parsed = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        part.parse::<ActivityType>()
            .map_err(ApiError::Validation)?;
        parsed.push(part.to_string());
    }
    if parsed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_filter_none() {
        assert_eq!(parse_type_filter(None).unwrap(), None);
        assert_eq!(parse_type_filter(Some("")).unwrap(), None);
        assert_eq!(parse_type_filter(Some(" , ")).unwrap(), None);
    }

    #[test]
    fn test_parse_type_filter_valid() {
        let parsed = parse_type_filter(Some("SCAN,REWARD")).unwrap().unwrap();
        assert_eq!(parsed, vec!["SCAN".to_string(), "REWARD".to_string()]);
    }

    #[test]
    fn test_parse_type_filter_rejects_unknown() {
        assert!(parse_type_filter(Some("SCAN,BOGUS")).is_err());
    }
}
