//! Daily archive compaction background job.

use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::services::CompactionService;

/// Compacts yesterday's raw activity into archive day documents.
///
/// Fires at 00:30 UTC so the whole previous UTC day is closed before it runs.
pub struct ArchiveCompactionJob {
    service: CompactionService,
}

impl ArchiveCompactionJob {
    pub fn new(pool: PgPool) -> Self {
        Self {
            service: CompactionService::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl Job for ArchiveCompactionJob {
    fn name(&self) -> &'static str {
        "archive_compaction"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::DailyAt { hour: 0, minute: 30 }
    }

    async fn execute(&self) -> Result<(), String> {
        let outcome = self
            .service
            .compact_yesterday()
            .await
            .map_err(|e| format!("Failed to compact yesterday's activity: {}", e))?;

        info!(
            events_read = outcome.events_read,
            days_written = outcome.days_written,
            duration_ms = outcome.duration_ms,
            "Compacted yesterday's activity"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_at_half_past_midnight_utc() {
        // The job must run after the previous UTC day has fully closed.
        let freq = JobFrequency::DailyAt { hour: 0, minute: 30 };
        assert!(matches!(freq, JobFrequency::DailyAt { hour: 0, minute: 30 }));
    }
}
