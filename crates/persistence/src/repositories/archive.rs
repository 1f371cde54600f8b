//! Archive repository: idempotent day-document upserts and range reads.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::archive::ArchiveDay;

use crate::entities::ArchiveDayEntity;

/// Repository for permanent daily aggregates.
#[derive(Clone)]
pub struct ArchiveRepository {
    pool: PgPool,
}

impl ArchiveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert one day document keyed by (workspace, day).
    ///
    /// An existing document for the key is fully replaced, which is what
    /// makes recompaction of an already-compacted range safe.
    pub async fn upsert_day(&self, doc: &ArchiveDay) -> Result<(), sqlx::Error> {
        let timeline = serde_json::to_value(&doc.timeline)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            r#"
            INSERT INTO activity_archives (workspace_id, day, total_points, total_activities,
                                           active_users, timeline, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (workspace_id, day) DO UPDATE SET
                total_points = EXCLUDED.total_points,
                total_activities = EXCLUDED.total_activities,
                active_users = EXCLUDED.active_users,
                timeline = EXCLUDED.timeline,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(doc.workspace_id)
        .bind(doc.day)
        .bind(doc.total_points)
        .bind(doc.total_activities)
        .bind(doc.active_users)
        .bind(timeline)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Day documents for a workspace over `[from, to]`, oldest first.
    pub async fn find_range(
        &self,
        workspace_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ArchiveDayEntity>, sqlx::Error> {
        sqlx::query_as::<_, ArchiveDayEntity>(
            r#"
            SELECT id, workspace_id, day, total_points, total_activities, active_users,
                   timeline, created_at, updated_at
            FROM activity_archives
            WHERE workspace_id = $1 AND day >= $2 AND day <= $3
            ORDER BY day ASC
            "#,
        )
        .bind(workspace_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
    }

    /// One day document, if present.
    pub async fn find_day(
        &self,
        workspace_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<ArchiveDayEntity>, sqlx::Error> {
        sqlx::query_as::<_, ArchiveDayEntity>(
            r#"
            SELECT id, workspace_id, day, total_points, total_activities, active_users,
                   timeline, created_at, updated_at
            FROM activity_archives
            WHERE workspace_id = $1 AND day = $2
            "#,
        )
        .bind(workspace_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete every archive document in a workspace. Returns the deleted count.
    pub async fn delete_by_workspace(&self, workspace_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM activity_archives WHERE workspace_id = $1")
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
