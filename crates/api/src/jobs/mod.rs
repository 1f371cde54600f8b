//! Background job scheduler and job implementations.

mod archive_compaction;
mod cleanup_activities;
mod pool_metrics;
mod scheduler;

pub use archive_compaction::ArchiveCompactionJob;
pub use cleanup_activities::CleanupActivitiesJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::JobScheduler;
