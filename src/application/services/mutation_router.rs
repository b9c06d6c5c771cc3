use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::services::action_log::ActionLog;
use crate::domain::entities::offline::ActionPayload;
use crate::domain::value_objects::offline::{OperationKind, PendingActionId};
use crate::shared::error::AppError;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome<T> {
    /// 直接呼び出しがサーバーで確定した
    Applied(T),
    /// アクションログに積まれ、同期エンジンの再送待ち
    Queued(PendingActionId),
}

impl<T> RouteOutcome<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, RouteOutcome::Queued(_))
    }

    /// キュー行きの場合は楽観的に適用した値をそのまま使う
    pub fn applied_or(self, optimistic: T) -> T {
        match self {
            RouteOutcome::Applied(value) => value,
            RouteOutcome::Queued(_) => optimistic,
        }
    }
}

/// 書き込みを直接呼び出しかキューのどちらへ流すか決める
///
/// 同じエンティティに未送信またはデッドレターのアクションが残っている間は
/// 直接呼び出しを使わず、常にキューの後ろへ並べる。
pub struct MutationRouter {
    log: Arc<ActionLog>,
    connectivity: Arc<dyn ConnectivitySignal>,
}

impl MutationRouter {
    pub fn new(log: Arc<ActionLog>, connectivity: Arc<dyn ConnectivitySignal>) -> Self {
        Self { log, connectivity }
    }

    pub async fn submit<T, F, Fut>(
        &self,
        operation: OperationKind,
        payload: ActionPayload,
        direct: F,
    ) -> Result<RouteOutcome<T>, AppError>
    where
        F: FnOnce(ActionPayload) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        payload.validate(operation).map_err(AppError::Validation)?;
        let kind = payload.entity_kind();

        if !self.connectivity.is_online() {
            return self.queue(operation, payload, "offline").await;
        }
        if self.log.has_unsynced_for(kind, payload.entity_id()).await {
            return self.queue(operation, payload, "entity has unsynced actions").await;
        }

        match direct(payload.clone()).await {
            Ok(value) => Ok(RouteOutcome::Applied(value)),
            Err(err) if err.is_transient_remote() => {
                tracing::warn!(
                    target: "sync::router",
                    entity_kind = %kind,
                    error = %err,
                    "direct write failed transiently; falling back to queue"
                );
                self.queue(operation, payload, "transient failure").await
            }
            Err(err) => Err(err),
        }
    }

    async fn queue<T>(
        &self,
        operation: OperationKind,
        payload: ActionPayload,
        reason: &str,
    ) -> Result<RouteOutcome<T>, AppError> {
        let kind = payload.entity_kind();
        let id = self.log.enqueue(kind, operation, payload).await?;
        tracing::debug!(
            target: "sync::router",
            action_id = %id,
            entity_kind = %kind,
            reason,
            "write queued"
        );
        Ok(RouteOutcome::Queued(id))
    }
}
