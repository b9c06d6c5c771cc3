use super::in_flight::InFlightKeys;
use crate::domain::entities::optimistic::OptimisticEntity;
use crate::domain::value_objects::offline::EntityId;
use crate::shared::error::AppError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// 画面が保持するコレクションの楽観的キャッシュ
///
/// 変更はサーバー確定前に即座に反映し、失敗時は呼び出し時点で取った
/// スナップショットへ戻す。同じ ID への変更は同時に 1 つまで。
///
/// `replace_all` による再取得はサーバーの真値として扱う。実行中の更新が
/// 失敗しても再取得後の値は巻き戻さず、再取得で消えたエンティティも戻さない。
pub struct OptimisticCollection<T: OptimisticEntity> {
    items: RwLock<Vec<T>>,
    in_flight: InFlightKeys<EntityId>,
    /// `replace_all` ごとに進む（items の書き込みロック中にのみ更新）
    generation: AtomicU64,
}

impl<T: OptimisticEntity> Default for OptimisticCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: OptimisticEntity> OptimisticCollection<T> {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            in_flight: InFlightKeys::default(),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn items(&self) -> Vec<T> {
        self.items.read().await.clone()
    }

    pub async fn get(&self, id: &EntityId) -> Option<T> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.entity_id() == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.in_flight.contains(id)
    }

    /// 再取得したサーバーの一覧で置き換える。作成中の暫定エントリは残す。
    pub async fn replace_all(&self, fresh: Vec<T>) {
        let mut items = self.items.write().await;
        let provisional: Vec<T> = items
            .iter()
            .filter(|item| {
                let id = item.entity_id();
                id.is_temporary() && self.in_flight.contains(id)
            })
            .cloned()
            .collect();

        let kept = provisional.len();
        *items = fresh;
        items.extend(provisional);
        self.generation.fetch_add(1, Ordering::AcqRel);

        tracing::debug!(
            target: "sync::cache",
            total = items.len(),
            provisional = kept,
            "collection reconciled with server state"
        );
    }

    /// 仮 ID で暫定レコードを即時追加し、`create` の結果で置き換える
    pub async fn add_optimistic<F, Fut>(&self, draft: T::Draft, create: F) -> Result<T, AppError>
    where
        F: FnOnce(T::Draft) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let temp_id = EntityId::temporary();
        let _guard = self
            .in_flight
            .try_acquire(&temp_id)
            .ok_or_else(|| AppError::MutationInFlight(temp_id.to_string()))?;

        let provisional = T::provisional(temp_id.clone(), &draft);
        self.items.write().await.push(provisional);

        match create(draft).await {
            Ok(confirmed) => {
                let mut items = self.items.write().await;
                let confirmed_id = confirmed.entity_id().clone();
                // 確定前に再取得などで同じ ID が入っていた場合は重複させない
                items.retain(|item| item.entity_id() != &confirmed_id);

                match items.iter().position(|item| item.entity_id() == &temp_id) {
                    Some(index) => items[index] = confirmed.clone(),
                    None => items.push(confirmed.clone()),
                }

                tracing::debug!(
                    target: "sync::cache",
                    temp_id = %temp_id,
                    id = %confirmed_id,
                    "optimistic create confirmed"
                );
                Ok(confirmed)
            }
            Err(err) => {
                self.items
                    .write()
                    .await
                    .retain(|item| item.entity_id() != &temp_id);

                tracing::debug!(
                    target: "sync::cache",
                    temp_id = %temp_id,
                    error = %err,
                    "optimistic create rolled back"
                );
                Err(err)
            }
        }
    }

    pub async fn update_optimistic<F, Fut>(
        &self,
        id: &EntityId,
        patch: T::Patch,
        update: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(EntityId, T::Patch) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let _guard = self
            .in_flight
            .try_acquire(id)
            .ok_or_else(|| AppError::MutationInFlight(id.to_string()))?;

        let (generation, snapshot) = {
            let mut items = self.items.write().await;
            let index = items
                .iter()
                .position(|item| item.entity_id() == id)
                .ok_or_else(|| AppError::NotFound(format!("Entity {id} is not in the cache")))?;
            let snapshot = items[index].clone();
            items[index].apply_patch(&patch);
            (self.generation.load(Ordering::Acquire), snapshot)
        };

        match update(id.clone(), patch).await {
            Ok(confirmed) => {
                let mut items = self.items.write().await;
                if let Some(position) = items.iter().position(|item| item.entity_id() == id) {
                    items[position] = confirmed.clone();
                }
                Ok(confirmed)
            }
            Err(err) => {
                let mut items = self.items.write().await;
                let refetched = self.generation.load(Ordering::Acquire) != generation;
                if !refetched {
                    if let Some(position) = items.iter().position(|item| item.entity_id() == id) {
                        items[position] = snapshot;
                    }
                }

                tracing::debug!(
                    target: "sync::cache",
                    id = %id,
                    error = %err,
                    "optimistic update rolled back"
                );
                Err(err)
            }
        }
    }

    /// 失敗時は元の位置（一覧が縮んでいれば末尾）に戻す
    pub async fn remove_optimistic<F, Fut>(&self, id: &EntityId, delete: F) -> Result<(), AppError>
    where
        F: FnOnce(EntityId) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let _guard = self
            .in_flight
            .try_acquire(id)
            .ok_or_else(|| AppError::MutationInFlight(id.to_string()))?;

        let (index, snapshot) = {
            let mut items = self.items.write().await;
            let index = items
                .iter()
                .position(|item| item.entity_id() == id)
                .ok_or_else(|| AppError::NotFound(format!("Entity {id} is not in the cache")))?;
            (index, items.remove(index))
        };

        match delete(id.clone()).await {
            Ok(()) => {
                // 削除中の再取得で戻ってきた分も取り除く
                self.items
                    .write()
                    .await
                    .retain(|item| item.entity_id() != id);
                Ok(())
            }
            Err(err) => {
                let mut items = self.items.write().await;
                if !items.iter().any(|item| item.entity_id() == id) {
                    let at = index.min(items.len());
                    items.insert(at, snapshot);
                }

                tracing::debug!(
                    target: "sync::cache",
                    id = %id,
                    error = %err,
                    "optimistic remove rolled back"
                );
                Err(err)
            }
        }
    }
}
