use super::metrics::{SyncMetrics, SyncMetricsSnapshot};
use super::scheduler::SchedulerHandle;
use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::ports::remote_replayer::{RemoteError, RemoteReplayer};
use crate::application::services::action_log::ActionLog;
use crate::domain::entities::offline::{PendingAction, SyncPassReport, SyncSkipReason};
use crate::domain::value_objects::offline::{ActionStatus, EntityId, EntityKind};
use crate::shared::config::SyncConfig;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    pub interval: Duration,
    /// 0 は無制限
    pub max_attempts: u32,
    pub replay_timeout: Duration,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: 5,
            replay_timeout: Duration::from_secs(15),
        }
    }
}

impl From<&SyncConfig> for SyncEngineConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
            replay_timeout: config.replay_timeout(),
        }
    }
}

/// アクションログをリモートへ再送する同期エンジン
///
/// 状態は `Idle -> Syncing -> Idle` のみ。実行中に要求されたパスは
/// 待たせずに `AlreadyRunning` で即座に返す。
pub struct SyncEngine {
    log: Arc<ActionLog>,
    replayer: Arc<dyn RemoteReplayer>,
    pub(super) connectivity: Arc<dyn ConnectivitySignal>,
    pub(super) config: SyncEngineConfig,
    syncing: AtomicBool,
    last_sync: RwLock<Option<DateTime<Utc>>>,
    metrics: SyncMetrics,
    pub(super) scheduler: Mutex<Option<SchedulerHandle>>,
}

/// パス終了時（パニック含む）に Syncing フラグを下ろす
struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(
        log: Arc<ActionLog>,
        replayer: Arc<dyn RemoteReplayer>,
        connectivity: Arc<dyn ConnectivitySignal>,
        config: SyncEngineConfig,
    ) -> Self {
        Self {
            log,
            replayer,
            connectivity,
            config,
            syncing: AtomicBool::new(false),
            last_sync: RwLock::new(None),
            metrics: SyncMetrics::default(),
            scheduler: Mutex::new(None),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read().await
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &SyncEngineConfig {
        &self.config
    }

    /// 同期パスを 1 回実行する。タイマー・接続復帰・手動トリガーの共通入口。
    pub async fn sync_now(&self) -> SyncPassReport {
        if !self.connectivity.is_online() {
            tracing::debug!(target: "sync::engine", "offline; sync pass skipped");
            return self.skip(SyncSkipReason::Offline);
        }

        let Some(_guard) = SyncingGuard::acquire(&self.syncing) else {
            tracing::debug!(target: "sync::engine", "sync pass already in progress");
            return self.skip(SyncSkipReason::AlreadyRunning);
        };

        let mut report = SyncPassReport::started(Utc::now());
        let pending = self.log.list_pending().await;

        // デッドレターより後のアクションが先に届かないよう、同じエンティティは解消まで保留する
        let mut held: HashSet<(EntityKind, EntityId)> = self
            .log
            .dead_letters()
            .await
            .iter()
            .map(entity_key)
            .collect();

        for action in &pending {
            if held.contains(&entity_key(action)) {
                report.held_count += 1;
                tracing::debug!(
                    target: "sync::engine",
                    action_id = %action.id,
                    entity_kind = %action.entity_kind,
                    "replay held behind a dead letter"
                );
                continue;
            }

            match self.replay(action).await {
                Ok(()) => {
                    self.log.mark_synced(&action.id).await;
                    report.synced_count += 1;
                }
                Err(err) => {
                    report.failed_count += 1;
                    let message = format!(
                        "{} {} ({}): {}",
                        action.operation,
                        action.entity_kind,
                        action.payload.entity_id(),
                        err
                    );
                    tracing::warn!(
                        target: "sync::engine",
                        action_id = %action.id,
                        attempts = action.attempts + 1,
                        error = %err,
                        "replay failed; action stays pending"
                    );

                    let status = self
                        .log
                        .record_failure(&action.id, &err.to_string(), self.config.max_attempts)
                        .await;
                    if status == Some(ActionStatus::DeadLetter) {
                        report.dead_lettered_count += 1;
                        held.insert(entity_key(action));
                        tracing::error!(
                            target: "sync::engine",
                            action_id = %action.id,
                            entity_kind = %action.entity_kind,
                            max_attempts = self.config.max_attempts,
                            "action moved to dead letters"
                        );
                    }
                    report.errors.push(message);
                }
            }
        }

        if report.synced_count > 0 {
            self.log.compact().await;
            *self.last_sync.write().await = Some(Utc::now());
        }

        report.finished_at = Utc::now();
        self.metrics.record(&report);

        if report.synced_count > 0 || report.failed_count > 0 || report.held_count > 0 {
            tracing::info!(
                target: "sync::engine",
                synced = report.synced_count,
                failed = report.failed_count,
                dead_lettered = report.dead_lettered_count,
                held = report.held_count,
                "sync pass finished"
            );
        } else {
            tracing::debug!(target: "sync::engine", "sync pass found nothing to replay");
        }

        report
    }

    async fn replay(&self, action: &PendingAction) -> Result<(), RemoteError> {
        match tokio::time::timeout(self.config.replay_timeout, self.replayer.replay(action)).await
        {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    fn skip(&self, reason: SyncSkipReason) -> SyncPassReport {
        let report = SyncPassReport::skipped(reason);
        self.metrics.record(&report);
        report
    }
}

fn entity_key(action: &PendingAction) -> (EntityKind, EntityId) {
    (action.entity_kind, action.payload.entity_id().clone())
}
