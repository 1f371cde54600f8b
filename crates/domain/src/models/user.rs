//! User domain model.
//!
//! Only the cross-workspace counters matter to the scan pipeline; account
//! management lives outside this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    /// Global points total across every workspace.
    pub total_points: i64,
    /// Global scan count across every workspace.
    pub scan_count: i64,
    pub created_at: DateTime<Utc>,
}
