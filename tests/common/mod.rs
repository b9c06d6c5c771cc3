use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fieldops_sync::application::ports::{RemoteError, RemoteReplayer};
use fieldops_sync::domain::entities::offline::{ActionPayload, PendingAction};
use fieldops_sync::domain::entities::CustomerRecord;
use fieldops_sync::domain::value_objects::{EntityId, PendingActionId};
use fieldops_sync::shared::config::{AppConfig, StorageBackend};

/// 呼び出し順を記録し、指定したエンティティだけ失敗させる再送先
#[derive(Default)]
pub struct RecordingReplayer {
    seen: Mutex<Vec<PendingActionId>>,
    failing: Mutex<HashSet<EntityId>>,
}

impl RecordingReplayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, entity_id: &EntityId) {
        self.failing.lock().expect("failing set").insert(entity_id.clone());
    }

    #[allow(dead_code)]
    pub fn heal(&self) {
        self.failing.lock().expect("failing set").clear();
    }

    pub fn seen(&self) -> Vec<PendingActionId> {
        self.seen.lock().expect("seen list").clone()
    }
}

#[async_trait]
impl RemoteReplayer for RecordingReplayer {
    async fn replay(&self, action: &PendingAction) -> Result<(), RemoteError> {
        self.seen.lock().expect("seen list").push(action.id.clone());
        if self
            .failing
            .lock()
            .expect("failing set")
            .contains(action.payload.entity_id())
        {
            return Err(RemoteError::Network("simulated outage".into()));
        }
        Ok(())
    }
}

pub fn customer_payload(id: &str, name: &str) -> ActionPayload {
    ActionPayload::Customer(CustomerRecord {
        id: EntityId::new(id.to_string()).expect("entity id"),
        name: name.to_string(),
        email: None,
        phone: None,
        address: None,
    })
}

pub fn config_for(dir: &std::path::Path, backend: StorageBackend) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.backend = backend;
    config.storage.data_dir = dir.display().to_string();
    config.database.url = format!("sqlite://{}?mode=rwc", dir.join("sync.db").display());
    config.database.max_connections = 1;
    config
}
