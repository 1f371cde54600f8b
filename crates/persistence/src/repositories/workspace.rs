//! Workspace repository, including the ordered cascade delete.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::workspace::WorkspaceDeleteSummary;

use crate::entities::WorkspaceEntity;
use crate::repositories::{
    ActivityRepository, ArchiveRepository, DeviceRepository, MembershipRepository,
};

/// Repository for workspace records.
#[derive(Clone)]
pub struct WorkspaceRepository {
    pool: PgPool,
}

impl WorkspaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a workspace by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<WorkspaceEntity>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceEntity>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create a workspace.
    pub async fn insert(&self, name: &str) -> Result<WorkspaceEntity, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceEntity>(
            r#"
            INSERT INTO workspaces (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    /// Delete a workspace and everything it owns.
    ///
    /// Owned collections are deleted in an explicit order before the
    /// workspace row itself; each step reports its deleted count so the
    /// caller can observe exactly what was removed.
    pub async fn delete_cascade(
        &self,
        workspace_id: Uuid,
    ) -> Result<WorkspaceDeleteSummary, sqlx::Error> {
        let devices = DeviceRepository::new(self.pool.clone());
        let memberships = MembershipRepository::new(self.pool.clone());
        let activities = ActivityRepository::new(self.pool.clone());
        let archives = ArchiveRepository::new(self.pool.clone());

        // Activities reference devices; delete them first so the device
        // delete does not churn through ON DELETE SET NULL updates.
        let activities_deleted = activities.delete_by_workspace(workspace_id).await?;
        let devices_deleted = devices.delete_by_workspace(workspace_id).await?;
        let memberships_deleted = memberships.delete_by_workspace(workspace_id).await?;
        let archives_deleted = archives.delete_by_workspace(workspace_id).await?;

        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;

        Ok(WorkspaceDeleteSummary {
            devices_deleted,
            memberships_deleted,
            activities_deleted,
            archives_deleted,
            workspace_deleted: result.rows_affected() == 1,
        })
    }
}
