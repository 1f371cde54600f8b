//! Application services: the scan pipeline, archive compaction, and export
//! assembly.

pub mod compaction;
pub mod export;
pub mod scan;

pub use compaction::CompactionService;
pub use export::{ExportService, ExportShape};
pub use scan::{ScanError, ScanService};
