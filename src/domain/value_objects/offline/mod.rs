pub mod action_id;
pub mod action_status;
pub mod entity_id;
pub mod entity_kind;
pub mod operation_kind;

pub use action_id::PendingActionId;
pub use action_status::ActionStatus;
pub use entity_id::EntityId;
pub use entity_kind::EntityKind;
pub use operation_kind::OperationKind;
