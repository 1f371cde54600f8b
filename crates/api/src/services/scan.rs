//! The scan processor: decode, gate, resolve, replay-check, award, log.
//!
//! Each scan request walks a fixed sequence of steps and stops at the first
//! failure. No step with side effects runs before every gate has passed; the
//! award writes are issued concurrently and the request fails unless all of
//! them complete.

use axum::http::StatusCode;
use metrics::counter;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use domain::models::activity::{ActivityType, NewActivity};
use domain::models::device::DeviceType;
use domain::models::scan::{
    GlobalScanRequest, NormalizedScanPayload, ScanAction, ScanRequest, ScanResponse,
};
use domain::services::notification::{PushNotification, PushSender, ScanAwardPush};
use domain::services::scan_payload::{
    decode_encrypted_payload, normalize_plain_fields, PayloadError,
};
use persistence::entities::DeviceEntity;
use persistence::repositories::{
    ActivityRepository, DeviceRepository, MembershipRepository, UserRepository,
    WorkspaceRepository,
};
use shared::crypto::{sha256_hex, PayloadCipher};

use crate::error::ApiError;

/// Scans awarded per accepted request.
const SCANS_PER_AWARD: i64 = 1;

/// Scan pipeline failure taxonomy. Every variant maps to a distinct
/// caller-visible error code.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no scan payload supplied")]
    MissingPayload,

    #[error("payload decryption failed")]
    DecryptionFailed,

    #[error("invalid payload: {0}")]
    InvalidPayloadSchema(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("device not found")]
    DeviceNotFound,

    #[error("device belongs to another workspace")]
    WorkspaceMismatch {
        device_workspace_id: Uuid,
        caller_is_member: bool,
    },

    #[error("caller is not a member of workspace {workspace_name}")]
    NotAMember { workspace_name: String },

    #[error("replay detected")]
    ReplayDetected,

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::MissingPayload => ApiError::ScanRejected {
                code: "missing_payload",
                status: StatusCode::BAD_REQUEST,
                message: "A scan payload is required".to_string(),
                details: None,
            },
            // Replay and decryption rejections share one deliberately vague
            // message: callers must not be able to tell bad crypto from a
            // stale code.
            ScanError::DecryptionFailed => ApiError::ScanRejected {
                code: "decryption_failed",
                status: StatusCode::BAD_REQUEST,
                message: "Scan code could not be verified".to_string(),
                details: None,
            },
            ScanError::ReplayDetected => ApiError::ScanRejected {
                code: "replay_detected",
                status: StatusCode::CONFLICT,
                message: "Scan code could not be verified".to_string(),
                details: None,
            },
            ScanError::InvalidPayloadSchema(reason) => ApiError::ScanRejected {
                code: "invalid_payload",
                status: StatusCode::BAD_REQUEST,
                message: reason,
                details: None,
            },
            ScanError::InvalidAction(got) => ApiError::ScanRejected {
                code: "invalid_action",
                status: StatusCode::BAD_REQUEST,
                message: format!(
                    "Action {} does not award points; use the device registration flow instead",
                    got
                ),
                details: None,
            },
            ScanError::DeviceNotFound => ApiError::ScanRejected {
                code: "device_not_found",
                status: StatusCode::NOT_FOUND,
                message: "Device not found".to_string(),
                details: None,
            },
            ScanError::WorkspaceMismatch {
                device_workspace_id,
                caller_is_member,
            } => ApiError::ScanRejected {
                code: "workspace_mismatch",
                status: StatusCode::CONFLICT,
                message: "This device belongs to a different workspace".to_string(),
                details: Some(serde_json::json!({
                    "deviceWorkspaceId": device_workspace_id,
                    "isCallerMemberThere": caller_is_member,
                })),
            },
            ScanError::NotAMember { workspace_name } => ApiError::ScanRejected {
                code: "not_a_member",
                status: StatusCode::FORBIDDEN,
                message: format!("You are not a member of {}", workspace_name),
                details: None,
            },
            ScanError::Store(e) => ApiError::from(e),
        }
    }
}

/// Service driving the scan state machine.
#[derive(Clone)]
pub struct ScanService {
    pool: PgPool,
    cipher: PayloadCipher,
    push: Arc<dyn PushSender>,
    reward_points: i32,
}

impl ScanService {
    pub fn new(
        pool: PgPool,
        cipher: PayloadCipher,
        push: Arc<dyn PushSender>,
        reward_points: i32,
    ) -> Self {
        Self {
            pool,
            cipher,
            push,
            reward_points,
        }
    }

    /// Workspace-scoped scan: the caller names the target workspace and the
    /// device must belong to it.
    pub async fn process_workspace_scan(
        &self,
        caller_id: Uuid,
        workspace_id: Uuid,
        request: ScanRequest,
    ) -> Result<ScanResponse, ScanError> {
        let payload = self.decode_workspace_request(request)?;
        self.process(caller_id, Some(workspace_id), payload).await
    }

    /// Workspace-agnostic scan: the device's own binding picks the target
    /// workspace, then membership is checked there.
    pub async fn process_global_scan(
        &self,
        caller_id: Uuid,
        request: GlobalScanRequest,
    ) -> Result<ScanResponse, ScanError> {
        let payload = self.decode_encrypted(&request.encrypted_payload)?;
        self.process(caller_id, None, payload).await
    }

    /// Step 1: both request forms converge on one normalized payload.
    fn decode_workspace_request(
        &self,
        request: ScanRequest,
    ) -> Result<NormalizedScanPayload, ScanError> {
        if let Some(encrypted) = request.encrypted_payload {
            return self.decode_encrypted(&encrypted);
        }
        if request.device_id.is_none() && request.action.is_none() {
            return Err(ScanError::MissingPayload);
        }
        normalize_plain_fields(request.device_id, request.device_type, request.action)
            .map_err(payload_error)
    }

    fn decode_encrypted(&self, encrypted: &str) -> Result<NormalizedScanPayload, ScanError> {
        decode_encrypted_payload(&self.cipher, encrypted).map_err(|e| {
            if matches!(e, PayloadError::Decryption) {
                // Log a fingerprint, never the blob itself.
                tracing::warn!(
                    payload_sha256 = %sha256_hex(encrypted.as_bytes()),
                    "scan payload failed decryption"
                );
            }
            payload_error(e)
        })
    }

    /// Steps 2-7, shared by both entry points.
    async fn process(
        &self,
        caller_id: Uuid,
        target_workspace: Option<Uuid>,
        payload: NormalizedScanPayload,
    ) -> Result<ScanResponse, ScanError> {
        // Step 2: only SCAN earns points.
        if payload.action != ScanAction::Scan {
            counter!("scans_rejected_total", "reason" => "invalid_action").increment(1);
            return Err(ScanError::InvalidAction(
                payload.action.as_str().to_string(),
            ));
        }

        let devices = DeviceRepository::new(self.pool.clone());
        let memberships = MembershipRepository::new(self.pool.clone());

        // Step 3: resolve the device, hardware id first, record id fallback.
        let device = self.resolve_device(&devices, &payload.device_id).await?;

        let workspace_id = match target_workspace {
            Some(requested) => {
                if device.workspace_id != requested {
                    let caller_is_member = memberships
                        .is_member(device.workspace_id, caller_id)
                        .await?;
                    counter!("scans_rejected_total", "reason" => "workspace_mismatch")
                        .increment(1);
                    return Err(ScanError::WorkspaceMismatch {
                        device_workspace_id: device.workspace_id,
                        caller_is_member,
                    });
                }
                requested
            }
            None => device.workspace_id,
        };

        // Step 4: membership gate.
        if !memberships.is_member(workspace_id, caller_id).await? {
            let workspaces = WorkspaceRepository::new(self.pool.clone());
            let workspace_name = workspaces
                .find_by_id(workspace_id)
                .await?
                .map(|w| w.name)
                .unwrap_or_else(|| "this workspace".to_string());
            counter!("scans_rejected_total", "reason" => "not_a_member").increment(1);
            return Err(ScanError::NotAMember { workspace_name });
        }

        // Step 5: replay protection. The stored floor advances in the same
        // statement that checks it; a rejected code has no side effects.
        if let Some(unique_code) = payload.unique_code {
            let accepted = devices.advance_unique_code(device.id, unique_code).await?;
            if !accepted {
                counter!("scans_rejected_total", "reason" => "replay").increment(1);
                tracing::warn!(
                    device_id = %device.device_id,
                    unique_code,
                    floor = device.last_unique_code,
                    "replayed scan code rejected"
                );
                return Err(ScanError::ReplayDetected);
            }
        }

        // Step 6: award and log, issued concurrently. Any failure fails the
        // request even if sibling writes landed.
        let device_type = device
            .device_type
            .parse::<DeviceType>()
            .unwrap_or(DeviceType::Generic);
        let activity_input = NewActivity {
            workspace_id,
            user_id: caller_id,
            device_id: Some(device.id),
            device_type: Some(device_type),
            activity_type: ActivityType::Scan,
            title: format!("Scanned {}", device.display_name),
            description: format!(
                "Earned {} points at {} {}",
                self.reward_points,
                device_type.label(),
                device.display_name
            ),
            points: self.reward_points,
        };

        let users = UserRepository::new(self.pool.clone());
        let activities = ActivityRepository::new(self.pool.clone());

        let (membership_res, user_res, activity_res) = tokio::join!(
            memberships.award_scan(
                workspace_id,
                caller_id,
                self.reward_points as i64,
                SCANS_PER_AWARD
            ),
            users.award_scan(caller_id, self.reward_points as i64, SCANS_PER_AWARD),
            activities.append(activity_input),
        );

        let membership = membership_res?.ok_or(sqlx::Error::RowNotFound)?;
        let user = user_res?.ok_or(sqlx::Error::RowNotFound)?;
        let activity = activity_res?;

        counter!("scans_accepted_total").increment(1);

        // Step 7: fan out the push and echo the award.
        let push = self.push.clone();
        let notification = PushNotification::ScanAward(ScanAwardPush {
            workspace_id,
            user_id: caller_id,
            device_name: device.display_name.clone(),
            points_earned: self.reward_points,
            workspace_points: membership.points,
            timestamp: activity.created_at,
        });
        tokio::spawn(async move { push.send(notification).await });

        Ok(ScanResponse {
            points_earned: self.reward_points,
            workspace_points: membership.points,
            total_points: user.total_points,
            scan_count: membership.scan_count,
            activity: domain::models::Activity::from(activity).into(),
        })
    }

    async fn resolve_device(
        &self,
        devices: &DeviceRepository,
        device_id: &str,
    ) -> Result<DeviceEntity, ScanError> {
        if let Some(device) = devices.find_by_hardware_id(device_id).await? {
            return Ok(device);
        }
        // Fallback: the value may be a literal record identifier. Only query
        // when it lexically parses as one.
        if let Ok(record_id) = Uuid::parse_str(device_id) {
            if let Some(device) = devices.find_by_id(record_id).await? {
                return Ok(device);
            }
        }
        counter!("scans_rejected_total", "reason" => "device_not_found").increment(1);
        Err(ScanError::DeviceNotFound)
    }
}

fn payload_error(err: PayloadError) -> ScanError {
    match err {
        PayloadError::Decryption => {
            counter!("scans_rejected_total", "reason" => "decryption").increment(1);
            ScanError::DecryptionFailed
        }
        PayloadError::Schema(reason) => {
            counter!("scans_rejected_total", "reason" => "schema").increment(1);
            ScanError::InvalidPayloadSchema(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_maps_to_distinct_codes() {
        let cases: Vec<(ScanError, &str)> = vec![
            (ScanError::MissingPayload, "missing_payload"),
            (ScanError::DecryptionFailed, "decryption_failed"),
            (
                ScanError::InvalidPayloadSchema("deviceId is required".into()),
                "invalid_payload",
            ),
            (ScanError::InvalidAction("REGISTER".into()), "invalid_action"),
            (ScanError::DeviceNotFound, "device_not_found"),
            (
                ScanError::WorkspaceMismatch {
                    device_workspace_id: Uuid::nil(),
                    caller_is_member: true,
                },
                "workspace_mismatch",
            ),
            (
                ScanError::NotAMember {
                    workspace_name: "Green HQ".into(),
                },
                "not_a_member",
            ),
            (ScanError::ReplayDetected, "replay_detected"),
        ];

        for (err, expected_code) in cases {
            match ApiError::from(err) {
                ApiError::ScanRejected { code, .. } => assert_eq!(code, expected_code),
                other => panic!("expected ScanRejected, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_replay_and_decryption_messages_equally_vague() {
        let replay = match ApiError::from(ScanError::ReplayDetected) {
            ApiError::ScanRejected { message, .. } => message,
            _ => unreachable!(),
        };
        let decrypt = match ApiError::from(ScanError::DecryptionFailed) {
            ApiError::ScanRejected { message, .. } => message,
            _ => unreachable!(),
        };
        assert_eq!(replay, decrypt);
    }

    #[test]
    fn test_invalid_action_message_points_at_registration() {
        match ApiError::from(ScanError::InvalidAction("REGISTER".into())) {
            ApiError::ScanRejected { message, .. } => {
                assert!(message.contains("registration"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_workspace_mismatch_details_expose_redirect_hint() {
        let ws = Uuid::new_v4();
        match ApiError::from(ScanError::WorkspaceMismatch {
            device_workspace_id: ws,
            caller_is_member: false,
        }) {
            ApiError::ScanRejected { details, .. } => {
                let details = details.unwrap();
                assert_eq!(details["deviceWorkspaceId"], serde_json::json!(ws));
                assert_eq!(details["isCallerMemberThere"], serde_json::json!(false));
            }
            _ => unreachable!(),
        }
    }
}
