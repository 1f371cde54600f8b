//! Activity repository: append-only raw event log with incremental sync,
//! graph aggregation, compaction range selects, export, and retention purge.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::activity::NewActivity;

use crate::entities::{ActivityEntity, DaySlotEntity, HourSlotEntity, TypeSlotEntity};

/// Filters for the MY_ACTIVITY export path.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub user_id: Option<Uuid>,
    pub device_type: Option<String>,
    pub activity_type: Option<String>,
}

/// Repository for the raw activity log.
#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one activity record.
    pub async fn append(&self, input: NewActivity) -> Result<ActivityEntity, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntity>(
            r#"
            INSERT INTO activities (workspace_id, user_id, device_id, device_type,
                                    activity_type, title, description, points, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, workspace_id, user_id, device_id, device_type, activity_type,
                      title, description, points, created_at
            "#,
        )
        .bind(input.workspace_id)
        .bind(input.user_id)
        .bind(input.device_id)
        .bind(input.device_type.map(|t| t.as_str().to_string()))
        .bind(input.activity_type.as_str())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.points)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    /// Incremental sync: activities strictly newer than `since`, most recent
    /// first. The caller supplies its membership join date when it has no
    /// sync cursor yet.
    pub async fn list_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ActivityEntity>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntity>(
            r#"
            SELECT id, workspace_id, user_id, device_id, device_type, activity_type,
                   title, description, points, created_at
            FROM activities
            WHERE workspace_id = $1 AND created_at > $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(workspace_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Hour-of-day aggregation for the today/yesterday graphs.
    pub async fn aggregate_by_hour(
        &self,
        workspace_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        types: Option<&[String]>,
    ) -> Result<Vec<HourSlotEntity>, sqlx::Error> {
        sqlx::query_as::<_, HourSlotEntity>(
            r#"
            SELECT EXTRACT(HOUR FROM created_at AT TIME ZONE 'UTC')::int4 AS hour,
                   COUNT(*)::int8 AS count,
                   COALESCE(SUM(points), 0)::int8 AS points
            FROM activities
            WHERE workspace_id = $1
              AND created_at >= $2 AND created_at < $3
              AND ($4::text[] IS NULL OR activity_type = ANY($4))
            GROUP BY hour
            ORDER BY hour
            "#,
        )
        .bind(workspace_id)
        .bind(start)
        .bind(end)
        .bind(types)
        .fetch_all(&self.pool)
        .await
    }

    /// Calendar-day aggregation for the 7days/30days graphs.
    pub async fn aggregate_by_day(
        &self,
        workspace_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        types: Option<&[String]>,
    ) -> Result<Vec<DaySlotEntity>, sqlx::Error> {
        sqlx::query_as::<_, DaySlotEntity>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   COUNT(*)::int8 AS count,
                   COALESCE(SUM(points), 0)::int8 AS points
            FROM activities
            WHERE workspace_id = $1
              AND created_at >= $2 AND created_at < $3
              AND ($4::text[] IS NULL OR activity_type = ANY($4))
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(workspace_id)
        .bind(start)
        .bind(end)
        .bind(types)
        .fetch_all(&self.pool)
        .await
    }

    /// Per-type aggregation inside a window.
    pub async fn aggregate_by_type(
        &self,
        workspace_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TypeSlotEntity>, sqlx::Error> {
        sqlx::query_as::<_, TypeSlotEntity>(
            r#"
            SELECT activity_type,
                   COUNT(*)::int8 AS count,
                   COALESCE(SUM(points), 0)::int8 AS points
            FROM activities
            WHERE workspace_id = $1
              AND created_at >= $2 AND created_at < $3
            GROUP BY activity_type
            "#,
        )
        .bind(workspace_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
    }

    /// All raw activities with creation time in `[start, end)`, across every
    /// workspace. Input to the compaction pipeline.
    pub async fn select_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityEntity>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntity>(
            r#"
            SELECT id, workspace_id, user_id, device_id, device_type, activity_type,
                   title, description, points, created_at
            FROM activities
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
    }

    /// Per-event export rows for the MY_ACTIVITY scope, newest first.
    pub async fn export_rows(
        &self,
        workspace_id: Uuid,
        filter: &ExportFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityEntity>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntity>(
            r#"
            SELECT id, workspace_id, user_id, device_id, device_type, activity_type,
                   title, description, points, created_at
            FROM activities
            WHERE workspace_id = $1
              AND created_at >= $2 AND created_at < $3
              AND ($4::uuid IS NULL OR user_id = $4)
              AND ($5::text IS NULL OR device_type = $5)
              AND ($6::text IS NULL OR activity_type = $6)
            ORDER BY created_at DESC
            "#,
        )
        .bind(workspace_id)
        .bind(start)
        .bind(end)
        .bind(filter.user_id)
        .bind(filter.device_type.as_deref())
        .bind(filter.activity_type.as_deref())
        .fetch_all(&self.pool)
        .await
    }

    /// Purge activities older than `retention_days`, in batches to avoid long
    /// locks. Returns the total number of rows deleted.
    pub async fn delete_expired(
        &self,
        retention_days: u32,
        batch_size: i64,
    ) -> Result<u64, sqlx::Error> {
        let mut total_deleted: u64 = 0;

        loop {
            let result = sqlx::query(
                r#"
                WITH to_delete AS (
                    SELECT id FROM activities
                    WHERE created_at < NOW() - ($1 || ' days')::INTERVAL
                    LIMIT $2
                )
                DELETE FROM activities
                WHERE id IN (SELECT id FROM to_delete)
                "#,
            )
            .bind(retention_days as i32)
            .bind(batch_size)
            .execute(&self.pool)
            .await?;

            let deleted = result.rows_affected();
            total_deleted += deleted;

            if deleted < batch_size as u64 {
                break;
            }

            tracing::debug!(deleted, "retention purge batch complete");
            tokio::task::yield_now().await;
        }

        Ok(total_deleted)
    }

    /// Delete every activity in a workspace. Returns the deleted count.
    pub async fn delete_by_workspace(&self, workspace_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM activities WHERE workspace_id = $1")
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
