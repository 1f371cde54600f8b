//! Workspace membership model.
//!
//! Membership is the join-entity granting a user points and a role within one
//! workspace. Its `joined_date` bounds first-sync activity queries; its
//! counters are incremented atomically by the scan processor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Role within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipRole {
    Owner,
    Admin,
    Member,
}

impl FromStr for MembershipRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(MembershipRole::Owner),
            "ADMIN" => Ok(MembershipRole::Admin),
            "MEMBER" => Ok(MembershipRole::Member),
            _ => Err(format!("Unknown membership role: {}", s)),
        }
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipRole::Owner => write!(f, "OWNER"),
            MembershipRole::Admin => write!(f, "ADMIN"),
            MembershipRole::Member => write!(f, "MEMBER"),
        }
    }
}

/// A user's membership in one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub points: i64,
    pub scan_count: i64,
    pub active: bool,
    pub joined_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [
            MembershipRole::Owner,
            MembershipRole::Admin,
            MembershipRole::Member,
        ] {
            assert_eq!(role.to_string().parse::<MembershipRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_unknown() {
        assert!("GUEST".parse::<MembershipRole>().is_err());
    }
}
