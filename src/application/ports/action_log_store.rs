use crate::domain::entities::offline::PendingAction;
use crate::domain::value_objects::offline::{ActionStatus, EntityId, EntityKind, PendingActionId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// アクションログの永続化ポート
///
/// 実装は挿入順を保持し、`compact` と `append` が並行しても
/// 追加されたエントリを失わないこと。
#[async_trait]
pub trait ActionLogStore: Send + Sync {
    async fn append(&self, action: &PendingAction) -> Result<(), AppError>;

    /// 指定状態のエントリを enqueue 順で返す
    async fn list_by_status(&self, status: ActionStatus) -> Result<Vec<PendingAction>, AppError>;

    async fn count_by_status(&self, status: ActionStatus) -> Result<u64, AppError>;

    /// 未同期（pending またはデッドレター）のエントリがあるか
    async fn has_unsynced_for(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<bool, AppError>;

    /// 未同期のエントリだけを同期済みにする。対象が無ければ `false`。
    async fn mark_synced(
        &self,
        id: &PendingActionId,
        synced_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// 失敗を記録し、更新後の状態を返す。未同期エントリが無ければ `None`。
    async fn record_failure(
        &self,
        id: &PendingActionId,
        error: &str,
        max_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<ActionStatus>, AppError>;

    async fn requeue(&self, id: &PendingActionId) -> Result<bool, AppError>;

    async fn remove(&self, id: &PendingActionId) -> Result<bool, AppError>;

    /// 同期済みエントリを削除し、削除件数を返す
    async fn compact(&self) -> Result<u64, AppError>;
}
