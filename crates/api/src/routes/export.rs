//! Export endpoint handler.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use persistence::repositories::MembershipRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;
use crate::services::export::{ExportRequest, ExportService};

/// Header telling the caller which row shape the file carries.
pub const EXPORT_SHAPE_HEADER: &str = "x-export-shape";

/// Export workspace activity as CSV.
///
/// POST /api/v1/workspaces/:workspace_id/export
///
/// MY_ACTIVITY produces per-event detail rows from the raw log (clamped to
/// the 30-day retention window); ALL produces per-bucket aggregate rows from
/// the archive. The `X-Export-Shape` response header names the shape.
pub async fn export_activity(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
    Json(request): Json<ExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let memberships = MembershipRepository::new(state.pool.clone());
    if !memberships.is_member(workspace_id, caller.user_id).await? {
        return Err(ApiError::Forbidden(
            "You are not a member of this workspace".to_string(),
        ));
    }

    let file = ExportService::new(state.pool.clone())
        .export(workspace_id, caller.user_id, request)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"activity-export.csv\""),
    );
    headers.insert(
        header::HeaderName::from_static(EXPORT_SHAPE_HEADER),
        HeaderValue::from_static(file.shape.as_str()),
    );

    Ok((StatusCode::OK, headers, file.csv))
}
