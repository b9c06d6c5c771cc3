use crate::domain::value_objects::offline::EntityId;

/// 楽観的ビューキャッシュに載せられるレコード
///
/// `Draft` は作成時の入力（ID なし）、`Patch` は部分更新の内容。
pub trait OptimisticEntity: Clone + Send + Sync + 'static {
    type Draft: Clone + Send + Sync + 'static;
    type Patch: Send + Sync + 'static;

    fn entity_id(&self) -> &EntityId;

    /// 仮 ID を割り当てた暫定レコードを組み立てる
    fn provisional(id: EntityId, draft: &Self::Draft) -> Self;

    fn apply_patch(&mut self, patch: &Self::Patch);
}
