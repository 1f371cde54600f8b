//! Membership entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::membership::{Membership, MembershipRole};

/// Database row mapping for the memberships table.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipEntity {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub points: i64,
    pub scan_count: i64,
    pub active: bool,
    pub joined_date: DateTime<Utc>,
}

impl From<MembershipEntity> for Membership {
    fn from(entity: MembershipEntity) -> Self {
        Self {
            id: entity.id,
            workspace_id: entity.workspace_id,
            user_id: entity.user_id,
            role: entity
                .role
                .parse::<MembershipRole>()
                .unwrap_or(MembershipRole::Member),
            points: entity.points,
            scan_count: entity.scan_count,
            active: entity.active,
            joined_date: entity.joined_date,
        }
    }
}
