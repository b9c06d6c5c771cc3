use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncSkipReason {
    Offline,
    /// 別のパスが実行中（エラーではなく no-op 扱い）
    AlreadyRunning,
}

impl SyncSkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncSkipReason::Offline => "offline",
            SyncSkipReason::AlreadyRunning => "already_running",
        }
    }
}

/// 同期パス 1 回分の結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPassReport {
    pub skipped: Option<SyncSkipReason>,
    pub synced_count: u32,
    pub failed_count: u32,
    pub dead_lettered_count: u32,
    /// 同じエンティティにデッドレターが残っているため見送った件数
    pub held_count: u32,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncPassReport {
    pub fn skipped(reason: SyncSkipReason) -> Self {
        let now = Utc::now();
        Self {
            skipped: Some(reason),
            synced_count: 0,
            failed_count: 0,
            dead_lettered_count: 0,
            held_count: 0,
            errors: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            skipped: None,
            synced_count: 0,
            failed_count: 0,
            dead_lettered_count: 0,
            held_count: 0,
            errors: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    pub fn ran(&self) -> bool {
        self.skipped.is_none()
    }
}
