//! Push notification payloads and the delivery seam.
//!
//! Delivery transport is an external collaborator; this module only defines
//! what the backend hands to it. Scan awards fan out a push alongside the
//! activity record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Push payload for a scan award.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAwardPush {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub device_name: String,
    pub points_earned: i32,
    pub workspace_points: i64,
    pub timestamp: DateTime<Utc>,
}

/// Envelope handed to the delivery transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PushNotification {
    ScanAward(ScanAwardPush),
}

/// Delivery seam. The in-process implementation logs; production wires a
/// real transport behind this trait.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, notification: PushNotification);
}

/// Sender that records notifications to the log stream only.
#[derive(Debug, Clone, Default)]
pub struct LogPushSender;

#[async_trait]
impl PushSender for LogPushSender {
    async fn send(&self, notification: PushNotification) {
        match &notification {
            PushNotification::ScanAward(push) => {
                tracing::info!(
                    workspace_id = %push.workspace_id,
                    user_id = %push.user_id,
                    points = push.points_earned,
                    "push notification dispatched"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_payload_serialization() {
        let push = PushNotification::ScanAward(ScanAwardPush {
            workspace_id: Uuid::nil(),
            user_id: Uuid::nil(),
            device_name: "Lobby bin".to_string(),
            points_earned: 10,
            workspace_points: 60,
            timestamp: Utc::now(),
        });
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["kind"], "scanAward");
        assert_eq!(json["pointsEarned"], 10);
    }

    #[tokio::test]
    async fn test_log_sender_does_not_panic() {
        let sender = LogPushSender;
        sender
            .send(PushNotification::ScanAward(ScanAwardPush {
                workspace_id: Uuid::nil(),
                user_id: Uuid::nil(),
                device_name: "x".into(),
                points_earned: 10,
                workspace_points: 10,
                timestamp: Utc::now(),
            }))
            .await;
    }
}
