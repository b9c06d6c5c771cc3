use crate::domain::entities::offline::{PendingAction, SyncPassReport, SyncStatusSnapshot};
use crate::presentation::dto::Validate;
use crate::shared::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 添付ファイルを含むため大きめに取る
const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub is_online: bool,
    pub last_sync: Option<String>,
    pub pending_actions: u64,
    pub dead_letters: u64,
    pub is_syncing: bool,
}

impl From<SyncStatusSnapshot> for SyncStatusResponse {
    fn from(snapshot: SyncStatusSnapshot) -> Self {
        Self {
            is_online: snapshot.is_online,
            last_sync: snapshot.last_sync.map(|at| at.to_rfc3339()),
            pending_actions: snapshot.pending_actions,
            dead_letters: snapshot.dead_letters,
            is_syncing: snapshot.is_syncing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncNowResponse {
    pub ran: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
    pub synced_count: u32,
    pub failed_count: u32,
    pub dead_lettered_count: u32,
    pub held_count: u32,
    pub errors: Vec<String>,
}

impl From<SyncPassReport> for SyncNowResponse {
    fn from(report: SyncPassReport) -> Self {
        Self {
            ran: report.ran(),
            skipped_reason: report.skipped.map(|reason| reason.as_str().to_string()),
            synced_count: report.synced_count,
            failed_count: report.failed_count,
            dead_lettered_count: report.dead_lettered_count,
            held_count: report.held_count,
            errors: report.errors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingActionResponse {
    pub action_id: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub operation: String,
    pub status: String,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub enqueued_at: String,
    pub last_attempt_at: Option<String>,
    pub payload: Value,
}

impl TryFrom<&PendingAction> for PendingActionResponse {
    type Error = AppError;

    fn try_from(action: &PendingAction) -> Result<Self, Self::Error> {
        Ok(Self {
            action_id: action.id.to_string(),
            entity_kind: action.entity_kind.to_string(),
            entity_id: action.payload.entity_id().to_string(),
            operation: action.operation.to_string(),
            status: action.status.as_str().to_string(),
            attempts: action.attempts,
            last_error: action.last_error.clone(),
            enqueued_at: action.enqueued_at.to_rfc3339(),
            last_attempt_at: action.last_attempt_at.map(|at| at.to_rfc3339()),
            payload: serde_json::to_value(&action.payload)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueActionRequest {
    pub entity_kind: String,
    pub operation: String,
    /// 種別ごとのレコード本体（タグなし）
    pub payload: Value,
}

impl Validate for EnqueueActionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.entity_kind.trim().is_empty() {
            return Err("Entity kind is required".to_string());
        }
        if self.operation.trim().is_empty() {
            return Err("Operation is required".to_string());
        }
        if !self.payload.is_object() {
            return Err("Payload must be a JSON object".to_string());
        }
        if self.payload.to_string().len() > MAX_PAYLOAD_BYTES {
            return Err("Payload is too large (max 10MB)".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueActionResponse {
    pub action_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionIdRequest {
    pub action_id: String,
}

impl Validate for ActionIdRequest {
    fn validate(&self) -> Result<(), String> {
        if self.action_id.trim().is_empty() {
            return Err("Action ID is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionMutationResponse {
    pub action_id: String,
    pub changed: bool,
}
