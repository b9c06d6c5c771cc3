use super::mappers::{format_timestamp, map_rows};
use super::rows::PendingActionRow;
use crate::application::ports::action_log_store::ActionLogStore;
use crate::domain::entities::offline::PendingAction;
use crate::domain::value_objects::offline::{ActionStatus, EntityId, EntityKind, PendingActionId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// SQLite 上のアクションログ。`seq` (AUTOINCREMENT) が enqueue 順を保持する。
pub struct SqliteActionLogStore {
    pool: Pool<Sqlite>,
}

impl SqliteActionLogStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn load_by_status(&self, status: ActionStatus) -> Result<Vec<PendingAction>, AppError> {
        let rows = sqlx::query_as::<_, PendingActionRow>(
            r#"
            SELECT * FROM pending_actions
            WHERE status = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        let (actions, undecodable) = map_rows(rows);
        if status == ActionStatus::Pending {
            for (seq, error) in undecodable {
                self.quarantine(seq, &error).await;
            }
        }

        Ok(actions)
    }

    /// 再送できない行をデッドレターへ移し、未送信件数に残らないようにする
    async fn quarantine(&self, seq: i64, error: &str) {
        let result = sqlx::query(
            r#"
            UPDATE pending_actions
            SET status = 'dead_letter', last_error = ?1
            WHERE seq = ?2 AND status = 'pending'
            "#,
        )
        .bind(format!("undecodable row: {error}"))
        .bind(seq)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => tracing::error!(
                target: "sync::store",
                seq,
                "undecodable action moved to dead letters"
            ),
            Err(err) => tracing::warn!(
                target: "sync::store",
                seq,
                error = %err,
                "failed to quarantine undecodable action"
            ),
        }
    }
}

#[async_trait]
impl ActionLogStore for SqliteActionLogStore {
    async fn append(&self, action: &PendingAction) -> Result<(), AppError> {
        let payload = serde_json::to_string(&action.payload)?;

        sqlx::query(
            r#"
            INSERT INTO pending_actions (
                action_id, entity_kind, entity_id, operation, payload,
                status, attempts, last_error, enqueued_at, last_attempt_at, synced_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(action.id.as_str())
        .bind(action.entity_kind.as_str())
        .bind(action.payload.entity_id().as_str())
        .bind(action.operation.as_str())
        .bind(&payload)
        .bind(action.status.as_str())
        .bind(i64::from(action.attempts))
        .bind(&action.last_error)
        .bind(format_timestamp(&action.enqueued_at))
        .bind(action.last_attempt_at.as_ref().map(format_timestamp))
        .bind(action.synced_at.as_ref().map(format_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_status(&self, status: ActionStatus) -> Result<Vec<PendingAction>, AppError> {
        self.load_by_status(status).await
    }

    /// 読み出せる行だけを数え、`list_by_status` の件数と一致させる
    async fn count_by_status(&self, status: ActionStatus) -> Result<u64, AppError> {
        Ok(self.load_by_status(status).await?.len() as u64)
    }

    async fn has_unsynced_for(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT seq FROM pending_actions
            WHERE entity_kind = ?1 AND entity_id = ?2 AND status IN ('pending', 'dead_letter')
            LIMIT 1
            "#,
        )
        .bind(kind.as_str())
        .bind(entity_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    async fn mark_synced(
        &self,
        id: &PendingActionId,
        synced_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_actions
            SET status = 'synced', synced_at = ?1
            WHERE action_id = ?2 AND status = 'pending'
            "#,
        )
        .bind(format_timestamp(&synced_at))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_failure(
        &self,
        id: &PendingActionId,
        error: &str,
        max_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<ActionStatus>, AppError> {
        let status: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE pending_actions
            SET attempts = attempts + 1,
                last_error = ?1,
                last_attempt_at = ?2,
                status = CASE
                    WHEN ?3 > 0 AND attempts + 1 >= ?3 THEN 'dead_letter'
                    ELSE status
                END
            WHERE action_id = ?4 AND status = 'pending'
            RETURNING status
            "#,
        )
        .bind(error)
        .bind(format_timestamp(&at))
        .bind(i64::from(max_attempts))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        status
            .map(|value| ActionStatus::from_str(&value).map_err(AppError::Serialization))
            .transpose()
    }

    async fn requeue(&self, id: &PendingActionId) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_actions
            SET status = 'pending', attempts = 0, last_error = NULL
            WHERE action_id = ?1 AND status = 'dead_letter'
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: &PendingActionId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM pending_actions WHERE action_id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn compact(&self) -> Result<u64, AppError> {
        // 単一の DELETE 文なので、並行して追加された pending 行には触れない
        let result = sqlx::query("DELETE FROM pending_actions WHERE status = 'synced'")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::offline::ActionPayload;
    use crate::domain::entities::records::CustomerRecord;
    use crate::domain::value_objects::offline::OperationKind;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_store() -> (SqliteActionLogStore, Pool<Sqlite>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        (SqliteActionLogStore::new(pool.clone()), pool)
    }

    fn sample_action(index: u32) -> PendingAction {
        PendingAction::new(
            OperationKind::Create,
            ActionPayload::Customer(CustomerRecord {
                id: EntityId::new(format!("cust-{index}")).unwrap(),
                name: format!("Customer {index}"),
                email: None,
                phone: None,
                address: None,
            }),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn lists_pending_in_insertion_order() {
        let (store, _pool) = setup_store().await;
        let actions: Vec<_> = (1..=3).map(sample_action).collect();
        for action in &actions {
            store.append(action).await.unwrap();
        }

        let pending = store.list_by_status(ActionStatus::Pending).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|a| a.id.clone()).collect();
        let expected: Vec<_> = actions.iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, expected);
        assert_eq!(pending[0], actions[0]);
    }

    #[tokio::test]
    async fn mark_synced_only_touches_pending_rows() {
        let (store, _pool) = setup_store().await;
        let action = sample_action(1);
        store.append(&action).await.unwrap();

        assert!(store.mark_synced(&action.id, Utc::now()).await.unwrap());
        assert!(!store.mark_synced(&action.id, Utc::now()).await.unwrap());
        assert!(
            !store
                .mark_synced(&PendingActionId::generate(), Utc::now())
                .await
                .unwrap()
        );
        assert_eq!(store.count_by_status(ActionStatus::Synced).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn record_failure_dead_letters_at_limit() {
        let (store, _pool) = setup_store().await;
        let action = sample_action(1);
        store.append(&action).await.unwrap();

        let first = store
            .record_failure(&action.id, "503", 2, Utc::now())
            .await
            .unwrap();
        assert_eq!(first, Some(ActionStatus::Pending));

        let second = store
            .record_failure(&action.id, "503", 2, Utc::now())
            .await
            .unwrap();
        assert_eq!(second, Some(ActionStatus::DeadLetter));

        let dead = store.list_by_status(ActionStatus::DeadLetter).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, 2);
        assert_eq!(dead[0].last_error.as_deref(), Some("503"));

        // デッドレターには失敗を積まない
        assert_eq!(
            store
                .record_failure(&action.id, "503", 2, Utc::now())
                .await
                .unwrap(),
            None
        );

        assert!(store
            .has_unsynced_for(EntityKind::Customer, action.payload.entity_id())
            .await
            .unwrap());
        assert!(store.requeue(&action.id).await.unwrap());
        assert_eq!(store.count_by_status(ActionStatus::Pending).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn compact_removes_only_synced_rows() {
        let (store, _pool) = setup_store().await;
        let a1 = sample_action(1);
        let a2 = sample_action(2);
        store.append(&a1).await.unwrap();
        store.mark_synced(&a1.id, Utc::now()).await.unwrap();

        let (removed, appended) = tokio::join!(store.compact(), store.append(&a2));
        appended.unwrap();
        assert_eq!(removed.unwrap(), 1);

        let pending = store.list_by_status(ActionStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a2.id);
        assert!(!pending[0].is_synced());
        assert_eq!(store.count_by_status(ActionStatus::Synced).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn undecodable_rows_are_moved_to_dead_letters() {
        let (store, pool) = setup_store().await;
        store.append(&sample_action(1)).await.unwrap();

        sqlx::query(
            r#"
            INSERT INTO pending_actions (action_id, entity_kind, entity_id, operation, payload, status, enqueued_at)
            VALUES ('broken', 'customer', 'x', 'create', '{not json', 'pending', '2026-01-01T00:00:00Z')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(store.count_by_status(ActionStatus::Pending).await.unwrap(), 1);
        let pending = store.list_by_status(ActionStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);

        let (status, last_error): (String, Option<String>) = sqlx::query_as(
            "SELECT status, last_error FROM pending_actions WHERE action_id = 'broken'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, "dead_letter");
        assert!(last_error.unwrap().starts_with("undecodable row"));

        // 読めない行は一覧にも件数にも出ない
        assert_eq!(store.count_by_status(ActionStatus::DeadLetter).await.unwrap(), 0);
        assert_eq!(store.compact().await.unwrap(), 0);
    }
}
