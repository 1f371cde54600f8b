//! Scan endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use uuid::Uuid;

use domain::models::scan::{GlobalScanRequest, ScanRequest, ScanResponse};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

/// Workspace-scoped scan.
///
/// POST /api/v1/workspaces/:workspace_id/scan
///
/// Accepts either `{encryptedPayload}` or the legacy plain
/// `{deviceId, action, type}` form.
pub async fn scan_workspace(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let response = state
        .scan_service()
        .process_workspace_scan(caller.user_id, workspace_id, request)
        .await?;

    info!(
        workspace_id = %workspace_id,
        user_id = %caller.user_id,
        points = response.points_earned,
        "scan accepted"
    );

    Ok(Json(response))
}

/// Workspace-agnostic scan: the device's own binding selects the workspace.
///
/// POST /api/v1/scan
pub async fn scan_global(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<GlobalScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let response = state
        .scan_service()
        .process_global_scan(caller.user_id, request)
        .await?;

    info!(
        user_id = %caller.user_id,
        points = response.points_earned,
        "global scan accepted"
    );

    Ok(Json(response))
}
