//! Device endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::activity::{ActivityType, NewActivity};
use domain::models::device::{
    Device, DeviceMetadata, DeviceType, RegisterDeviceRequest, TransferDeviceRequest,
    UpdateDeviceRequest,
};
use domain::models::scan::ScanAction;
use domain::services::scan_payload::{decode_encrypted_payload, PayloadError};
use persistence::repositories::{
    ActivityRepository, DeviceRepository, DeviceInput, DeviceUpdate, MembershipRepository,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;

/// Registration body: manual fields, or an encrypted REGISTER payload from
/// the device's provisioning QR code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub encrypted_payload: Option<String>,
    pub device_id: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<DeviceType>,
    #[serde(default)]
    pub metadata: std::collections::BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListResponse {
    pub devices: Vec<Device>,
}

/// Register a device in a workspace.
///
/// POST /api/v1/workspaces/:workspace_id/devices
///
/// A hardware id already bound to any workspace is rejected with a conflict;
/// it becomes registrable again only after removal from its current owner.
pub async fn register_device(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
    Json(body): Json<DeviceRegistration>,
) -> Result<Json<Device>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;

    let input = if let Some(encrypted) = body.encrypted_payload {
        let payload =
            decode_encrypted_payload(&state.cipher, &encrypted).map_err(|e| match e {
                PayloadError::Decryption => {
                    ApiError::Validation("Registration payload could not be verified".to_string())
                }
                PayloadError::Schema(reason) => ApiError::Validation(reason),
            })?;
        if payload.action != ScanAction::Register {
            return Err(ApiError::Validation(
                "Payload action must be REGISTER".to_string(),
            ));
        }
        let display_name = body
            .display_name
            .unwrap_or_else(|| payload.device_id.clone());
        DeviceInput {
            device_id: payload.device_id,
            display_name,
            device_type: DeviceType::from_wire(&payload.device_type)
                .as_str()
                .to_string(),
            workspace_id,
            metadata: serde_json::json!({}),
        }
    } else {
        let manual = RegisterDeviceRequest {
            device_id: body
                .device_id
                .ok_or_else(|| ApiError::Validation("deviceId is required".to_string()))?,
            display_name: body
                .display_name
                .ok_or_else(|| ApiError::Validation("displayName is required".to_string()))?,
            device_type: body.device_type.unwrap_or(DeviceType::Generic),
            metadata: body.metadata,
        };
        manual.validate()?;
        let metadata = DeviceMetadata::from_map(manual.metadata.clone())
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        DeviceInput {
            device_id: manual.device_id,
            display_name: manual.display_name,
            device_type: manual.device_type.as_str().to_string(),
            workspace_id,
            metadata: serde_json::to_value(metadata)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        }
    };

    let devices = DeviceRepository::new(state.pool.clone());
    let entity = devices.insert(input).await.map_err(|e| match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => ApiError::Conflict(
            "A device with this hardware id is already registered".to_string(),
        ),
        _ => ApiError::from(e),
    })?;

    let device: Device = entity.into();
    log_device_activity(
        &state,
        workspace_id,
        caller.user_id,
        &device,
        ActivityType::DeviceAdded,
        format!("Added {}", device.display_name),
    )
    .await;

    info!(
        workspace_id = %workspace_id,
        device_id = %device.device_id,
        "device registered"
    );

    Ok(Json(device))
}

/// List workspace devices.
///
/// GET /api/v1/workspaces/:workspace_id/devices
pub async fn list_devices(
    State(state): State<AppState>,
    caller: Caller,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<DeviceListResponse>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;

    let devices = DeviceRepository::new(state.pool.clone());
    let entities = devices.list_by_workspace(workspace_id).await?;

    Ok(Json(DeviceListResponse {
        devices: entities.into_iter().map(Device::from).collect(),
    }))
}

/// Fetch one device.
///
/// GET /api/v1/workspaces/:workspace_id/devices/:device_id
pub async fn get_device(
    State(state): State<AppState>,
    caller: Caller,
    Path((workspace_id, device_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Device>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;
    let entity = find_owned_device(&state, workspace_id, device_id).await?;
    Ok(Json(entity.into()))
}

/// Update a device's name, status, or metadata.
///
/// PATCH /api/v1/workspaces/:workspace_id/devices/:device_id
pub async fn update_device(
    State(state): State<AppState>,
    caller: Caller,
    Path((workspace_id, device_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateDeviceRequest>,
) -> Result<Json<Device>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;
    body.validate()?;
    find_owned_device(&state, workspace_id, device_id).await?;

    let metadata = match body.metadata {
        Some(map) => {
            let meta =
                DeviceMetadata::from_map(map).map_err(|e| ApiError::Validation(e.to_string()))?;
            Some(serde_json::to_value(meta).map_err(|e| ApiError::Internal(e.to_string()))?)
        }
        None => None,
    };

    let devices = DeviceRepository::new(state.pool.clone());
    let entity = devices
        .update(
            device_id,
            DeviceUpdate {
                display_name: body.display_name,
                status: body.status.map(|s| s.to_string()),
                metadata,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    Ok(Json(entity.into()))
}

/// Transfer a device to another workspace.
///
/// POST /api/v1/workspaces/:workspace_id/devices/:device_id/transfer
pub async fn transfer_device(
    State(state): State<AppState>,
    caller: Caller,
    Path((workspace_id, device_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<TransferDeviceRequest>,
) -> Result<Json<Device>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;
    require_member(&state, body.target_workspace_id, caller.user_id).await?;
    let entity = find_owned_device(&state, workspace_id, device_id).await?;

    let devices = DeviceRepository::new(state.pool.clone());
    let transferred = devices
        .transfer(entity.id, body.target_workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;

    let device: Device = transferred.into();
    log_device_activity(
        &state,
        workspace_id,
        caller.user_id,
        &device,
        ActivityType::DeviceTransferredOut,
        format!("Transferred {} out", device.display_name),
    )
    .await;
    log_device_activity(
        &state,
        body.target_workspace_id,
        caller.user_id,
        &device,
        ActivityType::DeviceTransferredIn,
        format!("Transferred {} in", device.display_name),
    )
    .await;

    info!(
        device_id = %device.device_id,
        from = %workspace_id,
        to = %body.target_workspace_id,
        "device transferred"
    );

    Ok(Json(device))
}

/// Remove a device. Historical activity referencing it is retained.
///
/// DELETE /api/v1/workspaces/:workspace_id/devices/:device_id
pub async fn delete_device(
    State(state): State<AppState>,
    caller: Caller,
    Path((workspace_id, device_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_member(&state, workspace_id, caller.user_id).await?;
    let entity = find_owned_device(&state, workspace_id, device_id).await?;
    let device: Device = entity.into();

    // Log before the delete so the activity keeps its device snapshot.
    log_device_activity(
        &state,
        workspace_id,
        caller.user_id,
        &device,
        ActivityType::DeviceRemoved,
        format!("Removed {}", device.display_name),
    )
    .await;

    let devices = DeviceRepository::new(state.pool.clone());
    let deleted = devices.delete(device.id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
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

async fn find_owned_device(
    state: &AppState,
    workspace_id: Uuid,
    device_id: Uuid,
) -> Result<persistence::entities::DeviceEntity, ApiError> {
    let devices = DeviceRepository::new(state.pool.clone());
    let entity = devices
        .find_by_id(device_id)
        .await?
        .filter(|d| d.workspace_id == workspace_id)
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?;
    Ok(entity)
}

async fn log_device_activity(
    state: &AppState,
    workspace_id: Uuid,
    user_id: Uuid,
    device: &Device,
    activity_type: ActivityType,
    title: String,
) {
    let activities = ActivityRepository::new(state.pool.clone());
    let result = activities
        .append(NewActivity {
            workspace_id,
            user_id,
            device_id: Some(device.id),
            device_type: Some(device.device_type),
            activity_type,
            title,
            description: String::new(),
            points: 0,
        })
        .await;
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to log device activity");
    }
}
