use crate::domain::entities::offline::PendingAction;
pub use crate::shared::error::RemoteError;
use async_trait::async_trait;

/// 保留アクションをリモートバックエンドへ再送するポート
#[async_trait]
pub trait RemoteReplayer: Send + Sync {
    async fn replay(&self, action: &PendingAction) -> Result<(), RemoteError>;
}
