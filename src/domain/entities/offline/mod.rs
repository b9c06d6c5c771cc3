pub mod payload;
pub mod pending_action;
pub mod sync_report;
pub mod sync_status;

pub use payload::ActionPayload;
pub use pending_action::PendingAction;
pub use sync_report::{SyncPassReport, SyncSkipReason};
pub use sync_status::SyncStatusSnapshot;
