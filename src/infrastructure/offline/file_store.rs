use crate::application::ports::action_log_store::ActionLogStore;
use crate::domain::entities::offline::PendingAction;
use crate::domain::value_objects::offline::{ActionStatus, EntityId, EntityKind, PendingActionId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// ログ文書のキー（ファイル名の stem）
pub const STORAGE_KEY: &str = "pending_actions";
const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ActionLogDocument {
    version: u32,
    actions: Vec<PendingAction>,
}

impl Default for ActionLogDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            actions: Vec::new(),
        }
    }
}

/// キー/値ストア相当の JSON 文書として保存するアクションログ
///
/// 変更のたびに一時ファイルへ書き出してから rename するため、
/// 途中で落ちても直前の文書が残る。
pub struct JsonFileActionLogStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileActionLogStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ActionLogDocument, AppError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let document: ActionLogDocument = serde_json::from_slice(&bytes)?;
                if document.version != DOCUMENT_VERSION {
                    return Err(AppError::Serialization(format!(
                        "Unsupported action log version {}",
                        document.version
                    )));
                }
                Ok(document)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(ActionLogDocument::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, document: &ActionLogDocument) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// 文書を読み込み、変更して書き戻す。`f` が false を返した場合は書き込まない。
    async fn modify<R, F>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut Vec<PendingAction>) -> (R, bool),
    {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let (result, changed) = f(&mut document.actions);
        if changed {
            self.save(&document).await?;
        }
        Ok(result)
    }

    async fn read<R, F>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&[PendingAction]) -> R,
    {
        let _guard = self.lock.lock().await;
        let document = self.load().await?;
        Ok(f(&document.actions))
    }
}

#[async_trait]
impl ActionLogStore for JsonFileActionLogStore {
    async fn append(&self, action: &PendingAction) -> Result<(), AppError> {
        let action = action.clone();
        self.modify(move |actions| {
            actions.push(action);
            ((), true)
        })
        .await
    }

    async fn list_by_status(&self, status: ActionStatus) -> Result<Vec<PendingAction>, AppError> {
        self.read(|actions| {
            actions
                .iter()
                .filter(|action| action.status == status)
                .cloned()
                .collect()
        })
        .await
    }

    async fn count_by_status(&self, status: ActionStatus) -> Result<u64, AppError> {
        self.read(|actions| actions.iter().filter(|a| a.status == status).count() as u64)
            .await
    }

    async fn has_unsynced_for(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<bool, AppError> {
        self.read(|actions| {
            actions.iter().any(|action| {
                !action.is_synced()
                    && action.entity_kind == kind
                    && action.payload.entity_id() == entity_id
            })
        })
        .await
    }

    async fn mark_synced(
        &self,
        id: &PendingActionId,
        synced_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.modify(|actions| {
            let changed = actions
                .iter_mut()
                .find(|action| &action.id == id)
                .map(|action| action.mark_synced(synced_at))
                .unwrap_or(false);
            (changed, changed)
        })
        .await
    }

    async fn record_failure(
        &self,
        id: &PendingActionId,
        error: &str,
        max_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<ActionStatus>, AppError> {
        self.modify(|actions| {
            let status = actions
                .iter_mut()
                .find(|action| &action.id == id && action.is_pending())
                .map(|action| {
                    action.record_failure(error, max_attempts, at);
                    action.status
                });
            let changed = status.is_some();
            (status, changed)
        })
        .await
    }

    async fn requeue(&self, id: &PendingActionId) -> Result<bool, AppError> {
        self.modify(|actions| {
            let changed = actions
                .iter_mut()
                .find(|action| &action.id == id)
                .map(|action| action.requeue())
                .unwrap_or(false);
            (changed, changed)
        })
        .await
    }

    async fn remove(&self, id: &PendingActionId) -> Result<bool, AppError> {
        self.modify(|actions| {
            let before = actions.len();
            actions.retain(|action| &action.id != id);
            let changed = actions.len() != before;
            (changed, changed)
        })
        .await
    }

    async fn compact(&self) -> Result<u64, AppError> {
        self.modify(|actions| {
            let before = actions.len();
            actions.retain(|action| !action.is_synced());
            let removed = (before - actions.len()) as u64;
            (removed, removed > 0)
        })
        .await
    }
}
