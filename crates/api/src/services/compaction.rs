//! Archive compaction driver.
//!
//! Pulls raw activities for a `[start, end)` window, runs the pure grouping
//! pipeline, and upserts the resulting day documents. Because grouping is a
//! pure function and the upsert replaces whole documents keyed by
//! (workspace, day), re-running any range is safe.

use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sqlx::PgPool;
use tracing::info;

use domain::services::compaction::{build_day_documents, yesterday_window, RawEvent};
use persistence::repositories::{ActivityRepository, ArchiveRepository};

/// Outcome of one compaction run.
#[derive(Debug, Clone, Copy)]
pub struct CompactionOutcome {
    pub duration_ms: u64,
    pub events_read: usize,
    pub days_written: usize,
}

/// Service running the archive compaction pipeline.
#[derive(Clone)]
pub struct CompactionService {
    pool: PgPool,
}

impl CompactionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Compact all raw activity in `[start, end)` into day documents.
    pub async fn compact(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CompactionOutcome, sqlx::Error> {
        let timer = Instant::now();

        let activities = ActivityRepository::new(self.pool.clone());
        let archives = ArchiveRepository::new(self.pool.clone());

        let rows = activities.select_range(start, end).await?;
        let events_read = rows.len();

        let documents = build_day_documents(rows.into_iter().map(RawEvent::from));
        let days_written = documents.len();

        for doc in &documents {
            archives.upsert_day(doc).await?;
        }

        let duration_ms = timer.elapsed().as_millis() as u64;
        counter!("archive_compaction_runs_total").increment(1);
        histogram!("archive_compaction_duration_seconds")
            .record(timer.elapsed().as_secs_f64());

        info!(
            start = %start,
            end = %end,
            events_read,
            days_written,
            duration_ms,
            "archive compaction completed"
        );

        Ok(CompactionOutcome {
            duration_ms,
            events_read,
            days_written,
        })
    }

    /// Compact `[yesterday 00:00 UTC, today 00:00 UTC)`.
    pub async fn compact_yesterday(&self) -> Result<CompactionOutcome, sqlx::Error> {
        let (start, end) = yesterday_window(Utc::now());
        self.compact(start, end).await
    }
}
