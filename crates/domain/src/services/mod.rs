//! Domain services for EcoPoints.
//!
//! Services contain business logic that operates on domain models.

pub mod compaction;
pub mod graph;
pub mod notification;
pub mod scan_payload;

pub use compaction::{build_day_documents, RawEvent};
pub use graph::{build_graph, GraphRange, GraphResponse};
pub use notification::{PushNotification, PushSender, ScanAwardPush};
pub use scan_payload::{
    decode_encrypted_payload, encode_payload_for_device, normalize_plain_fields, PayloadError,
};
