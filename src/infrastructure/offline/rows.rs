use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingActionRow {
    pub seq: i64,
    pub action_id: String,
    pub entity_kind: String,
    pub entity_id: Option<String>,
    pub operation: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub enqueued_at: String,
    pub last_attempt_at: Option<String>,
    pub synced_at: Option<String>,
}
