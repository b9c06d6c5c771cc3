use crate::application::ports::action_log_store::ActionLogStore;
use crate::domain::entities::offline::PendingAction;
use crate::domain::value_objects::offline::{ActionStatus, EntityId, EntityKind, PendingActionId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// プロセス内メモリのみのアクションログ（永続化なしのフォールバック）
#[derive(Default)]
pub struct InMemoryActionLogStore {
    actions: RwLock<Vec<PendingAction>>,
}

impl InMemoryActionLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.actions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actions.read().await.is_empty()
    }
}

#[async_trait]
impl ActionLogStore for InMemoryActionLogStore {
    async fn append(&self, action: &PendingAction) -> Result<(), AppError> {
        self.actions.write().await.push(action.clone());
        Ok(())
    }

    async fn list_by_status(&self, status: ActionStatus) -> Result<Vec<PendingAction>, AppError> {
        let actions = self.actions.read().await;
        Ok(actions
            .iter()
            .filter(|action| action.status == status)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self, status: ActionStatus) -> Result<u64, AppError> {
        let actions = self.actions.read().await;
        Ok(actions.iter().filter(|action| action.status == status).count() as u64)
    }

    async fn has_unsynced_for(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<bool, AppError> {
        let actions = self.actions.read().await;
        Ok(actions.iter().any(|action| {
            !action.is_synced()
                && action.entity_kind == kind
                && action.payload.entity_id() == entity_id
        }))
    }

    async fn mark_synced(
        &self,
        id: &PendingActionId,
        synced_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut actions = self.actions.write().await;
        Ok(actions
            .iter_mut()
            .find(|action| &action.id == id)
            .map(|action| action.mark_synced(synced_at))
            .unwrap_or(false))
    }

    async fn record_failure(
        &self,
        id: &PendingActionId,
        error: &str,
        max_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<ActionStatus>, AppError> {
        let mut actions = self.actions.write().await;
        Ok(actions
            .iter_mut()
            .find(|action| &action.id == id && action.is_pending())
            .map(|action| {
                action.record_failure(error, max_attempts, at);
                action.status
            }))
    }

    async fn requeue(&self, id: &PendingActionId) -> Result<bool, AppError> {
        let mut actions = self.actions.write().await;
        Ok(actions
            .iter_mut()
            .find(|action| &action.id == id)
            .map(|action| action.requeue())
            .unwrap_or(false))
    }

    async fn remove(&self, id: &PendingActionId) -> Result<bool, AppError> {
        let mut actions = self.actions.write().await;
        let before = actions.len();
        actions.retain(|action| &action.id != id);
        Ok(actions.len() != before)
    }

    async fn compact(&self) -> Result<u64, AppError> {
        let mut actions = self.actions.write().await;
        let before = actions.len();
        actions.retain(|action| !action.is_synced());
        Ok((before - actions.len()) as u64)
    }
}
