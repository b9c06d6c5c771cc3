mod core;
mod metrics;
mod scheduler;

#[cfg(test)]
mod tests;

pub use self::core::{SyncEngine, SyncEngineConfig};
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
