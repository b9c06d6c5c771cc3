pub mod action_log;
pub mod mutation_router;
pub mod optimistic;
pub mod replay_registry;
pub mod status_monitor;
pub mod sync_engine;

pub use action_log::ActionLog;
pub use mutation_router::{MutationRouter, RouteOutcome};
pub use optimistic::{OptimisticCell, OptimisticCollection};
pub use replay_registry::ReplayRegistry;
pub use status_monitor::SyncStatusMonitor;
pub use sync_engine::{SyncEngine, SyncEngineConfig, SyncMetricsSnapshot};
