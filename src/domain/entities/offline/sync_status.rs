use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UI と同期エンジンが参照する同期状態のスナップショット
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusSnapshot {
    pub is_online: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub pending_actions: u64,
    pub dead_letters: u64,
    pub is_syncing: bool,
}
