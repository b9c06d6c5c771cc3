pub mod offline;

pub use offline::{ActionStatus, EntityId, EntityKind, OperationKind, PendingActionId};
