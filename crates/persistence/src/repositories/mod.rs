//! Repository implementations for database operations.

pub mod activity;
pub mod archive;
pub mod device;
pub mod membership;
pub mod user;
pub mod workspace;

pub use activity::{ActivityRepository, ExportFilter};
pub use archive::ArchiveRepository;
pub use device::{DeviceInput, DeviceRepository, DeviceUpdate};
pub use membership::MembershipRepository;
pub use user::UserRepository;
pub use workspace::WorkspaceRepository;
