//! Membership repository.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::MembershipEntity;

/// Repository for workspace memberships.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user's active membership in a workspace.
    pub async fn find_active(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MembershipEntity>, sqlx::Error> {
        sqlx::query_as::<_, MembershipEntity>(
            r#"
            SELECT id, workspace_id, user_id, role, points, scan_count, active, joined_date
            FROM memberships
            WHERE workspace_id = $1 AND user_id = $2 AND active = true
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// True if the user holds an active membership in the workspace.
    pub async fn is_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM memberships
                WHERE workspace_id = $1 AND user_id = $2 AND active = true
            ) AS is_member
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// Atomically add a scan award to the membership counters.
    ///
    /// The increment happens server-side so concurrent scanners in the same
    /// workspace never lose updates. Returns the updated row, or None if no
    /// active membership exists.
    pub async fn award_scan(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        points: i64,
        scans: i64,
    ) -> Result<Option<MembershipEntity>, sqlx::Error> {
        sqlx::query_as::<_, MembershipEntity>(
            r#"
            UPDATE memberships
            SET points = points + $3, scan_count = scan_count + $4
            WHERE workspace_id = $1 AND user_id = $2 AND active = true
            RETURNING id, workspace_id, user_id, role, points, scan_count, active, joined_date
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(points)
        .bind(scans)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create a membership (used by fixtures and the member-join flow).
    pub async fn insert(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: &str,
    ) -> Result<MembershipEntity, sqlx::Error> {
        sqlx::query_as::<_, MembershipEntity>(
            r#"
            INSERT INTO memberships (workspace_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, workspace_id, user_id, role, points, scan_count, active, joined_date
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    /// Delete every membership in a workspace. Returns the deleted count.
    pub async fn delete_by_workspace(&self, workspace_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memberships WHERE workspace_id = $1")
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
