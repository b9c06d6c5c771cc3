use super::payload::ActionPayload;
use crate::domain::value_objects::offline::{
    ActionStatus, EntityKind, OperationKind, PendingActionId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// アクションログに記録された、リモート未反映の変更
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub id: PendingActionId,
    pub entity_kind: EntityKind,
    pub operation: OperationKind,
    pub payload: ActionPayload,
    pub enqueued_at: DateTime<Utc>,
    pub status: ActionStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl PendingAction {
    pub fn new(operation: OperationKind, payload: ActionPayload, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: PendingActionId::generate(),
            entity_kind: payload.entity_kind(),
            operation,
            payload,
            enqueued_at,
            status: ActionStatus::Pending,
            attempts: 0,
            last_error: None,
            last_attempt_at: None,
            synced_at: None,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.status == ActionStatus::Synced
    }

    pub fn is_pending(&self) -> bool {
        self.status == ActionStatus::Pending
    }

    pub fn mark_synced(&mut self, synced_at: DateTime<Utc>) -> bool {
        if self.status != ActionStatus::Pending {
            return false;
        }
        self.status = ActionStatus::Synced;
        self.synced_at = Some(synced_at);
        true
    }

    /// 再送失敗を記録する。`max_attempts` に達したらデッドレターへ移す（0 は無制限）。
    pub fn record_failure(&mut self, error: &str, max_attempts: u32, at: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = Some(error.to_string());
        self.last_attempt_at = Some(at);
        if max_attempts > 0 && self.attempts >= max_attempts {
            self.status = ActionStatus::DeadLetter;
        }
    }

    pub fn requeue(&mut self) -> bool {
        if self.status != ActionStatus::DeadLetter {
            return false;
        }
        self.status = ActionStatus::Pending;
        self.attempts = 0;
        self.last_error = None;
        true
    }
}
