//! Device repository for database operations.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::DeviceEntity;

/// Insert parameters for device registration.
#[derive(Debug, Clone)]
pub struct DeviceInput {
    pub device_id: String,
    pub display_name: String,
    pub device_type: String,
    pub workspace_id: Uuid,
    pub metadata: serde_json::Value,
}

/// Update parameters; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub display_name: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Repository for device-related database operations.
#[derive(Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a device by its hardware identifier.
    pub async fn find_by_hardware_id(
        &self,
        hardware_id: &str,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, device_id, display_name, device_type, status, workspace_id,
                   metadata, last_unique_code, created_at, updated_at
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(hardware_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a device by its internal record id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, device_id, display_name, device_type, status, workspace_id,
                   metadata, last_unique_code, created_at, updated_at
            FROM devices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Register a new device.
    ///
    /// The `devices.device_id` unique constraint rejects hardware ids already
    /// bound anywhere; the violation surfaces as a database error with code
    /// 23505.
    pub async fn insert(&self, input: DeviceInput) -> Result<DeviceEntity, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            INSERT INTO devices (device_id, display_name, device_type, status, workspace_id,
                                 metadata, last_unique_code, created_at, updated_at)
            VALUES ($1, $2, $3, 'ACTIVE', $4, $5, 0, $6, $6)
            RETURNING id, device_id, display_name, device_type, status, workspace_id,
                      metadata, last_unique_code, created_at, updated_at
            "#,
        )
        .bind(&input.device_id)
        .bind(&input.display_name)
        .bind(&input.device_type)
        .bind(input.workspace_id)
        .bind(&input.metadata)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// List all devices owned by a workspace, sorted by display name.
    pub async fn list_by_workspace(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, device_id, display_name, device_type, status, workspace_id,
                   metadata, last_unique_code, created_at, updated_at
            FROM devices
            WHERE workspace_id = $1
            ORDER BY display_name ASC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Apply a partial update to a device.
    pub async fn update(
        &self,
        id: Uuid,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            UPDATE devices
            SET display_name = COALESCE($2, display_name),
                status = COALESCE($3, status),
                metadata = COALESCE($4, metadata),
                updated_at = $5
            WHERE id = $1
            RETURNING id, device_id, display_name, device_type, status, workspace_id,
                      metadata, last_unique_code, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.display_name)
        .bind(update.status)
        .bind(update.metadata)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    /// Reassign a device to another workspace.
    pub async fn transfer(
        &self,
        id: Uuid,
        target_workspace_id: Uuid,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            UPDATE devices
            SET workspace_id = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, device_id, display_name, device_type, status, workspace_id,
                      metadata, last_unique_code, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(target_workspace_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    /// Advance the replay floor to `unique_code`.
    ///
    /// The comparison and the write happen in one statement, so two scans
    /// racing on the same or adjacent codes cannot both win: the predicate
    /// `last_unique_code < $2` observes a single consistent value under
    /// Postgres row locking. Returns true if the code was accepted.
    pub async fn advance_unique_code(
        &self,
        id: Uuid,
        unique_code: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET last_unique_code = $2, updated_at = $3
            WHERE id = $1 AND last_unique_code < $2
            "#,
        )
        .bind(id)
        .bind(unique_code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete a device record. Historical activities keep their snapshot
    /// columns; their device reference is nulled by the schema.
    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every device owned by a workspace. Returns the deleted count.
    pub async fn delete_by_workspace(&self, workspace_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM devices WHERE workspace_id = $1")
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
