//! User repository: global cross-workspace counters.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;

/// Repository for user records.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, display_name, total_points, scan_count, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Atomically add a scan award to the user's global counters.
    pub async fn award_scan(
        &self,
        user_id: Uuid,
        points: i64,
        scans: i64,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users
            SET total_points = total_points + $2, scan_count = scan_count + $3
            WHERE id = $1
            RETURNING id, display_name, total_points, scan_count, created_at
            "#,
        )
        .bind(user_id)
        .bind(points)
        .bind(scans)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create a user record (used by fixtures and the identity-sync flow).
    pub async fn insert(&self, id: Uuid, display_name: &str) -> Result<UserEntity, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (id, display_name)
            VALUES ($1, $2)
            RETURNING id, display_name, total_points, scan_count, created_at
            "#,
        )
        .bind(id)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
    }
}
