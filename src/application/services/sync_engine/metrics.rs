use crate::domain::entities::offline::{SyncPassReport, SyncSkipReason};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub passes_run: u64,
    pub passes_skipped_offline: u64,
    pub passes_skipped_busy: u64,
    pub actions_synced: u64,
    pub actions_failed: u64,
    pub actions_dead_lettered: u64,
    /// 1 件以上失敗したパスの連続数。全件成功したパスで 0 に戻る
    pub consecutive_failing_passes: u64,
    pub last_pass_duration_ms: Option<u64>,
}

/// エンジン単位の同期カウンタ
#[derive(Debug, Default)]
pub struct SyncMetrics {
    passes_run: AtomicU64,
    passes_skipped_offline: AtomicU64,
    passes_skipped_busy: AtomicU64,
    actions_synced: AtomicU64,
    actions_failed: AtomicU64,
    actions_dead_lettered: AtomicU64,
    consecutive_failing_passes: AtomicU64,
    last_pass_duration_ms: Mutex<Option<u64>>,
}

impl SyncMetrics {
    pub fn record(&self, report: &SyncPassReport) {
        match report.skipped {
            Some(SyncSkipReason::Offline) => {
                self.passes_skipped_offline.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Some(SyncSkipReason::AlreadyRunning) => {
                self.passes_skipped_busy.fetch_add(1, Ordering::Relaxed);
                return;
            }
            None => {}
        }

        self.passes_run.fetch_add(1, Ordering::Relaxed);
        self.actions_synced
            .fetch_add(u64::from(report.synced_count), Ordering::Relaxed);
        self.actions_failed
            .fetch_add(u64::from(report.failed_count), Ordering::Relaxed);
        self.actions_dead_lettered
            .fetch_add(u64::from(report.dead_lettered_count), Ordering::Relaxed);

        if report.failed_count > 0 {
            self.consecutive_failing_passes
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.consecutive_failing_passes.store(0, Ordering::Relaxed);
        }

        let duration_ms = (report.finished_at - report.started_at)
            .num_milliseconds()
            .max(0) as u64;
        *self
            .last_pass_duration_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(duration_ms);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let last_pass_duration_ms = *self
            .last_pass_duration_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        SyncMetricsSnapshot {
            passes_run: self.passes_run.load(Ordering::Relaxed),
            passes_skipped_offline: self.passes_skipped_offline.load(Ordering::Relaxed),
            passes_skipped_busy: self.passes_skipped_busy.load(Ordering::Relaxed),
            actions_synced: self.actions_synced.load(Ordering::Relaxed),
            actions_failed: self.actions_failed.load(Ordering::Relaxed),
            actions_dead_lettered: self.actions_dead_lettered.load(Ordering::Relaxed),
            consecutive_failing_passes: self.consecutive_failing_passes.load(Ordering::Relaxed),
            last_pass_duration_ms,
        }
    }
}
