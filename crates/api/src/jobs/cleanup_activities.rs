//! Activity retention purge background job.
//!
//! Raw activity records expire 30 days after creation. Postgres has no TTL
//! index, so a scheduled batched delete provides the passive expiry.

use sqlx::PgPool;
use tracing::info;

use persistence::repositories::ActivityRepository;

use super::scheduler::{Job, JobFrequency};

/// Background job purging expired raw activity records.
pub struct CleanupActivitiesJob {
    repo: ActivityRepository,
    retention_days: u32,
    batch_size: i64,
}

impl CleanupActivitiesJob {
    /// Create a new cleanup job.
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    /// * `retention_days` - Number of days to retain raw activities
    pub fn new(pool: PgPool, retention_days: u32) -> Self {
        Self {
            repo: ActivityRepository::new(pool),
            retention_days,
            batch_size: 10_000,
        }
    }
}

#[async_trait::async_trait]
impl Job for CleanupActivitiesJob {
    fn name(&self) -> &'static str {
        "cleanup_activities"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .repo
            .delete_expired(self.retention_days, self.batch_size)
            .await
            .map_err(|e| format!("Failed to delete expired activities: {}", e))?;

        info!(
            deleted,
            retention_days = self.retention_days,
            "Purged expired activities"
        );

        Ok(())
    }
}
