//! Workspace domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant grouping devices, members, and activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-collection deleted counts reported by workspace cascade deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDeleteSummary {
    pub devices_deleted: u64,
    pub memberships_deleted: u64,
    pub activities_deleted: u64,
    pub archives_deleted: u64,
    pub workspace_deleted: bool,
}
