use crate::application::ports::remote_replayer::{RemoteError, RemoteReplayer};
use crate::domain::entities::offline::PendingAction;
use crate::domain::value_objects::offline::EntityKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// エンティティ種別ごとの再送先をまとめるルーティングテーブル
#[derive(Default, Clone)]
pub struct ReplayRegistry {
    replayers: HashMap<EntityKind, Arc<dyn RemoteReplayer>>,
}

impl ReplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: EntityKind, replayer: Arc<dyn RemoteReplayer>) -> Self {
        self.replayers.insert(kind, replayer);
        self
    }

    pub fn is_registered(&self, kind: EntityKind) -> bool {
        self.replayers.contains_key(&kind)
    }
}

#[async_trait]
impl RemoteReplayer for ReplayRegistry {
    async fn replay(&self, action: &PendingAction) -> Result<(), RemoteError> {
        match self.replayers.get(&action.entity_kind) {
            Some(replayer) => replayer.replay(action).await,
            None => Err(RemoteError::Unsupported(action.entity_kind)),
        }
    }
}
