//! Domain models for EcoPoints.

pub mod activity;
pub mod archive;
pub mod device;
pub mod membership;
pub mod scan;
pub mod user;
pub mod workspace;

pub use activity::{Activity, ActivitySummary, ActivityType, NewActivity};
pub use archive::{ArchiveDay, TimelineBucket};
pub use device::{Device, DeviceStatus, DeviceType};
pub use membership::Membership;
pub use scan::{NormalizedScanPayload, ScanAction, ScanResponse};
pub use user::User;
pub use workspace::Workspace;
