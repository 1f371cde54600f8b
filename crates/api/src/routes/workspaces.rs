//! Workspace endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::activity::{ActivityType, NewActivity};
use domain::models::membership::MembershipRole;
use domain::models::workspace::{Workspace, WorkspaceDeleteSummary};
use persistence::repositories::{ActivityRepository, MembershipRepository, WorkspaceRepository};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    #[validate(length(
        min = 2,
        max = 80,
        message = "Workspace name must be between 2 and 80 characters"
    ))]
    pub name: String,
}

/// Create a workspace; the caller becomes its owner.
///
/// POST /api/v1/workspaces
pub async fn create_workspace(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateWorkspaceRequest>,
) -> Result<Json<Workspace>, ApiError> {
    request.validate()?;

    let workspaces = WorkspaceRepository::new(state.pool.clone());
    let workspace = workspaces.insert(&request.name).await?;

    let memberships = MembershipRepository::new(state.pool.clone());
    memberships
        .insert(workspace.id, caller.user_id, "OWNER")
        .await?;

    let activities = ActivityRepository::new(state.pool.clone());
    activities
        .append(NewActivity {
            workspace_id: workspace.id,
            user_id: caller.user_id,
            device_id: None,
            device_type: None,
            activity_type: ActivityType::MemberJoined,
            title: format!("Joined {}", workspace.name),
            description: String::new(),
            points: 0,
        })
        .await?;

    info!(workspace_id = %workspace.id, "workspace created");

    Ok(Json(workspace.into()))
}

/// Delete a workspace and everything it owns.
///
/// DELETE /api/v1/workspaces/:workspace_id
///
/// Owned collections are removed in an explicit order before the workspace
/// row; the response reports per-collection deleted counts.
pub async fn delete_workspace(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<WorkspaceDeleteSummary>, ApiError> {
    let memberships = MembershipRepository::new(state.pool.clone());
    let membership = memberships
        .find_active(workspace_id, caller.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden("You are not a member of this workspace".to_string())
        })?;

    let role = membership
        .role
        .parse::<MembershipRole>()
        .unwrap_or(MembershipRole::Member);
    if role == MembershipRole::Member {
        return Err(ApiError::Forbidden(
            "Only workspace owners or admins can delete a workspace".to_string(),
        ));
    }

    let workspaces = WorkspaceRepository::new(state.pool.clone());
    let summary = workspaces.delete_cascade(workspace_id).await?;

    info!(
        workspace_id = %workspace_id,
        devices = summary.devices_deleted,
        memberships = summary.memberships_deleted,
        activities = summary.activities_deleted,
        archives = summary.archives_deleted,
        "workspace deleted"
    );

    Ok(Json(summary))
}
