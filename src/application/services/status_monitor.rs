use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::services::action_log::ActionLog;
use crate::application::services::sync_engine::SyncEngine;
use crate::domain::entities::offline::SyncStatusSnapshot;
use std::sync::Arc;

/// 接続状態とアクションログの件数をまとめた読み取り専用ビュー
pub struct SyncStatusMonitor {
    connectivity: Arc<dyn ConnectivitySignal>,
    log: Arc<ActionLog>,
    engine: Arc<SyncEngine>,
}

impl SyncStatusMonitor {
    pub fn new(
        connectivity: Arc<dyn ConnectivitySignal>,
        log: Arc<ActionLog>,
        engine: Arc<SyncEngine>,
    ) -> Self {
        Self {
            connectivity,
            log,
            engine,
        }
    }

    /// 毎回その場で読み直す（接続状態はキャッシュしない）
    pub async fn get_status(&self) -> SyncStatusSnapshot {
        SyncStatusSnapshot {
            is_online: self.connectivity.is_online(),
            last_sync: self.engine.last_sync().await,
            pending_actions: self.log.pending_count().await,
            dead_letters: self.log.dead_letter_count().await,
            is_syncing: self.engine.is_syncing(),
        }
    }
}
