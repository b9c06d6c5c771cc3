use crate::application::ports::action_log_store::ActionLogStore;
use crate::domain::entities::offline::{ActionPayload, PendingAction};
use crate::domain::value_objects::offline::{
    ActionStatus, EntityId, EntityKind, OperationKind, PendingActionId,
};
use crate::shared::error::AppError;
use chrono::Utc;
use std::sync::Arc;

/// 永続アクションログ
///
/// ストレージ障害は呼び出し元に警告として扱われ、ログはフォールバック
/// （プロセス内メモリ）で動作を継続する。容量不足のみ enqueue の失敗として返す。
pub struct ActionLog {
    durable: Arc<dyn ActionLogStore>,
    fallback: Arc<dyn ActionLogStore>,
}

impl ActionLog {
    pub fn new(durable: Arc<dyn ActionLogStore>, fallback: Arc<dyn ActionLogStore>) -> Self {
        Self { durable, fallback }
    }

    pub async fn enqueue(
        &self,
        entity_kind: EntityKind,
        operation: OperationKind,
        payload: ActionPayload,
    ) -> Result<PendingActionId, AppError> {
        if payload.entity_kind() != entity_kind {
            return Err(AppError::Validation(format!(
                "Payload for {} cannot be enqueued as {}",
                payload.entity_kind(),
                entity_kind
            )));
        }
        payload.validate(operation).map_err(AppError::Validation)?;

        let action = PendingAction::new(operation, payload, Utc::now());

        match self.durable.append(&action).await {
            Ok(()) => {
                tracing::debug!(
                    target: "sync::log",
                    action_id = %action.id,
                    entity_kind = %action.entity_kind,
                    operation = %action.operation,
                    "action enqueued"
                );
                Ok(action.id)
            }
            Err(AppError::StorageFull(message)) => {
                tracing::error!(
                    target: "sync::log",
                    entity_kind = %action.entity_kind,
                    error = %message,
                    "action log storage is full; action dropped"
                );
                Err(AppError::StorageFull(message))
            }
            Err(err) => {
                tracing::warn!(
                    target: "sync::log",
                    action_id = %action.id,
                    error = %err,
                    "durable append failed; keeping action in memory only"
                );
                self.fallback.append(&action).await?;
                Ok(action.id)
            }
        }
    }

    /// 未同期エントリを enqueue 順で返す。読み出しに失敗した側は空として扱う。
    ///
    /// フォールバックにエントリがある場合は `enqueued_at` で並べ直すため、
    /// 両ストアにまたがる順序は壁時計に依存する（時計が巻き戻ると前後し得る）。
    pub async fn list_pending(&self) -> Vec<PendingAction> {
        self.list_merged(ActionStatus::Pending).await
    }

    pub async fn dead_letters(&self) -> Vec<PendingAction> {
        self.list_merged(ActionStatus::DeadLetter).await
    }

    pub async fn pending_count(&self) -> u64 {
        self.count_merged(ActionStatus::Pending).await
    }

    pub async fn dead_letter_count(&self) -> u64 {
        self.count_merged(ActionStatus::DeadLetter).await
    }

    /// 未送信またはデッドレターのアクションが残っているか
    pub async fn has_unsynced_for(&self, kind: EntityKind, entity_id: &EntityId) -> bool {
        for store in [&self.durable, &self.fallback] {
            match store.has_unsynced_for(kind, entity_id).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => warn_storage("has_unsynced_for", &err),
            }
        }
        false
    }

    /// 冪等。既に同期済み、または存在しない ID は何もしない。
    pub async fn mark_synced(&self, id: &PendingActionId) {
        let now = Utc::now();
        match self.durable.mark_synced(id, now).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => warn_storage("mark_synced", &err),
        }
        if let Err(err) = self.fallback.mark_synced(id, now).await {
            warn_storage("mark_synced", &err);
        }
    }

    pub async fn record_failure(
        &self,
        id: &PendingActionId,
        error: &str,
        max_attempts: u32,
    ) -> Option<ActionStatus> {
        let now = Utc::now();
        match self
            .durable
            .record_failure(id, error, max_attempts, now)
            .await
        {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {}
            Err(err) => warn_storage("record_failure", &err),
        }
        match self
            .fallback
            .record_failure(id, error, max_attempts, now)
            .await
        {
            Ok(status) => status,
            Err(err) => {
                warn_storage("record_failure", &err);
                None
            }
        }
    }

    /// 同期済みエントリを削除する。並行する enqueue は影響を受けない。
    pub async fn compact(&self) -> u64 {
        let mut removed = 0;
        for store in [&self.durable, &self.fallback] {
            match store.compact().await {
                Ok(count) => removed += count,
                Err(err) => warn_storage("compact", &err),
            }
        }
        if removed > 0 {
            tracing::debug!(target: "sync::log", removed, "action log compacted");
        }
        removed
    }

    /// デッドレターを再びキューに戻す（試行回数はリセット）
    pub async fn requeue(&self, id: &PendingActionId) -> Result<bool, AppError> {
        match self.durable.requeue(id).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) => warn_storage("requeue", &err),
        }
        self.fallback.requeue(id).await
    }

    pub async fn discard(&self, id: &PendingActionId) -> Result<bool, AppError> {
        match self.durable.remove(id).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) => warn_storage("discard", &err),
        }
        self.fallback.remove(id).await
    }

    async fn list_merged(&self, status: ActionStatus) -> Vec<PendingAction> {
        let mut actions = match self.durable.list_by_status(status).await {
            Ok(actions) => actions,
            Err(err) => {
                warn_storage("list", &err);
                Vec::new()
            }
        };

        match self.fallback.list_by_status(status).await {
            Ok(extra) if !extra.is_empty() => {
                actions.extend(extra);
                // 安定ソートなので同時刻のエントリは各ストア内の順序を保つ
                actions.sort_by_key(|action| action.enqueued_at);
            }
            Ok(_) => {}
            Err(err) => warn_storage("list", &err),
        }

        actions
    }

    async fn count_merged(&self, status: ActionStatus) -> u64 {
        let mut total = 0;
        for store in [&self.durable, &self.fallback] {
            match store.count_by_status(status).await {
                Ok(count) => total += count,
                Err(err) => warn_storage("count", &err),
            }
        }
        total
    }
}

fn warn_storage(operation: &str, err: &AppError) {
    tracing::warn!(
        target: "sync::log",
        operation,
        error = %err,
        "action log storage unavailable"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::records::CustomerRecord;
    use crate::infrastructure::offline::InMemoryActionLogStore;
    use async_trait::async_trait;
    use chrono::DateTime;

    /// 全操作が失敗するストア
    struct BrokenStore {
        full: bool,
    }

    impl BrokenStore {
        fn error(&self) -> AppError {
            if self.full {
                AppError::StorageFull("database or disk is full".into())
            } else {
                AppError::Storage("disk I/O error".into())
            }
        }
    }

    #[async_trait]
    impl ActionLogStore for BrokenStore {
        async fn append(&self, _action: &PendingAction) -> Result<(), AppError> {
            Err(self.error())
        }
        async fn list_by_status(&self, _: ActionStatus) -> Result<Vec<PendingAction>, AppError> {
            Err(self.error())
        }
        async fn count_by_status(&self, _: ActionStatus) -> Result<u64, AppError> {
            Err(self.error())
        }
        async fn has_unsynced_for(&self, _: EntityKind, _: &EntityId) -> Result<bool, AppError> {
            Err(self.error())
        }
        async fn mark_synced(
            &self,
            _: &PendingActionId,
            _: DateTime<Utc>,
        ) -> Result<bool, AppError> {
            Err(self.error())
        }
        async fn record_failure(
            &self,
            _: &PendingActionId,
            _: &str,
            _: u32,
            _: DateTime<Utc>,
        ) -> Result<Option<ActionStatus>, AppError> {
            Err(self.error())
        }
        async fn requeue(&self, _: &PendingActionId) -> Result<bool, AppError> {
            Err(self.error())
        }
        async fn remove(&self, _: &PendingActionId) -> Result<bool, AppError> {
            Err(self.error())
        }
        async fn compact(&self) -> Result<u64, AppError> {
            Err(self.error())
        }
    }

    fn memory_log() -> ActionLog {
        ActionLog::new(
            Arc::new(InMemoryActionLogStore::new()),
            Arc::new(InMemoryActionLogStore::new()),
        )
    }

    fn customer(id: &str, name: &str) -> ActionPayload {
        ActionPayload::Customer(CustomerRecord {
            id: EntityId::new(id.to_string()).unwrap(),
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
        })
    }

    #[tokio::test]
    async fn enqueue_rejects_mismatched_kind() {
        let log = memory_log();
        let err = log
            .enqueue(
                EntityKind::Invoice,
                OperationKind::Create,
                customer("cust-1", "Acme"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(log.pending_count().await, 0);
    }

    #[tokio::test]
    async fn enqueue_rejects_invalid_payload() {
        let log = memory_log();
        let err = log
            .enqueue(EntityKind::Customer, OperationKind::Create, customer("c", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn mark_synced_is_idempotent() {
        let log = memory_log();
        let id = log
            .enqueue(
                EntityKind::Customer,
                OperationKind::Create,
                customer("cust-1", "Acme"),
            )
            .await
            .unwrap();

        log.mark_synced(&id).await;
        let once = log.list_pending().await;
        log.mark_synced(&id).await;
        log.mark_synced(&PendingActionId::generate()).await;
        let twice = log.list_pending().await;

        assert!(once.is_empty());
        assert_eq!(once, twice);
        assert_eq!(log.compact().await, 1);
        assert_eq!(log.compact().await, 0);
    }

    #[tokio::test]
    async fn degrades_to_memory_when_durable_store_fails() {
        let log = ActionLog::new(
            Arc::new(BrokenStore { full: false }),
            Arc::new(InMemoryActionLogStore::new()),
        );

        let id = log
            .enqueue(
                EntityKind::Customer,
                OperationKind::Update,
                customer("cust-1", "Acme"),
            )
            .await
            .unwrap();

        let pending = log.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(log.pending_count().await, 1);

        log.mark_synced(&id).await;
        assert!(log.list_pending().await.is_empty());
        assert_eq!(log.compact().await, 1);
    }

    #[tokio::test]
    async fn fallback_entries_can_be_requeued_and_discarded_while_durable_fails() {
        let log = ActionLog::new(
            Arc::new(BrokenStore { full: false }),
            Arc::new(InMemoryActionLogStore::new()),
        );
        let first = log
            .enqueue(EntityKind::Customer, OperationKind::Update, customer("cust-1", "Acme"))
            .await
            .unwrap();
        let second = log
            .enqueue(EntityKind::Customer, OperationKind::Update, customer("cust-2", "Beta"))
            .await
            .unwrap();
        for id in [&first, &second] {
            assert_eq!(
                log.record_failure(id, "503", 1).await,
                Some(ActionStatus::DeadLetter)
            );
        }

        assert!(log.requeue(&first).await.unwrap());
        assert!(log.discard(&second).await.unwrap());

        let pending = log.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first);
        assert!(log.dead_letters().await.is_empty());
    }

    #[tokio::test]
    async fn storage_full_is_reported_and_not_retained() {
        let log = ActionLog::new(
            Arc::new(BrokenStore { full: true }),
            Arc::new(InMemoryActionLogStore::new()),
        );

        let err = log
            .enqueue(
                EntityKind::Customer,
                OperationKind::Create,
                customer("cust-1", "Acme"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::StorageFull(_)));
        assert!(log.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn dead_letters_leave_pending_list() {
        let log = memory_log();
        let id = log
            .enqueue(
                EntityKind::Customer,
                OperationKind::Create,
                customer("cust-1", "Acme"),
            )
            .await
            .unwrap();

        assert_eq!(
            log.record_failure(&id, "422", 1).await,
            Some(ActionStatus::DeadLetter)
        );
        assert!(log.list_pending().await.is_empty());
        assert_eq!(log.dead_letter_count().await, 1);
        // 同期済みではないので圧縮されない
        assert_eq!(log.compact().await, 0);

        assert!(log.requeue(&id).await.unwrap());
        let pending = log.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 0);

        assert!(log.discard(&id).await.unwrap());
        assert_eq!(log.pending_count().await, 0);
    }
}
