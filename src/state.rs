use crate::application::ports::action_log_store::ActionLogStore;
use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::ports::remote_replayer::RemoteReplayer;
use crate::application::services::{
    ActionLog, MutationRouter, SyncEngine, SyncEngineConfig, SyncStatusMonitor,
};
use crate::infrastructure::connectivity::{ManualConnectivity, ProbeConnectivity};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::{
    InMemoryActionLogStore, JsonFileActionLogStore, SqliteActionLogStore,
};
use crate::presentation::handlers::SyncHandler;
use crate::shared::config::{AppConfig, NetworkConfig, StorageBackend};
use crate::shared::error::AppError;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// 設定から組み立てた接続シグナル
#[derive(Clone)]
pub enum ConfiguredConnectivity {
    /// ホストが `set_online` で状態を通知する
    Manual(Arc<ManualConnectivity>),
    Probe(Arc<ProbeConnectivity>),
}

impl ConfiguredConnectivity {
    pub fn signal(&self) -> Arc<dyn ConnectivitySignal> {
        match self {
            ConfiguredConnectivity::Manual(manual) => manual.clone(),
            ConfiguredConnectivity::Probe(probe) => probe.clone(),
        }
    }

    pub fn manual(&self) -> Option<&Arc<ManualConnectivity>> {
        match self {
            ConfiguredConnectivity::Manual(manual) => Some(manual),
            ConfiguredConnectivity::Probe(_) => None,
        }
    }
}

/// `probe_address` があれば TCP プローブ、なければ手動通知。tokio ランタイム内で呼ぶこと。
pub fn connectivity_from_config(config: &NetworkConfig) -> ConfiguredConnectivity {
    match &config.probe_address {
        Some(address) => ConfiguredConnectivity::Probe(Arc::new(ProbeConnectivity::spawn(
            address.clone(),
            Duration::from_secs(config.probe_interval),
            Duration::from_secs(config.probe_timeout),
        ))),
        None => ConfiguredConnectivity::Manual(Arc::new(ManualConnectivity::default())),
    }
}

/// アプリケーション全体の状態を管理する構造体
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub action_log: Arc<ActionLog>,
    pub sync_engine: Arc<SyncEngine>,
    pub status_monitor: Arc<SyncStatusMonitor>,
    pub mutation_router: Arc<MutationRouter>,
    pub sync_handler: Arc<SyncHandler>,
    pub connectivity: Arc<dyn ConnectivitySignal>,
    db_pool: Option<ConnectionPool>,
}

impl AppState {
    pub async fn new(
        config: AppConfig,
        replayer: Arc<dyn RemoteReplayer>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(AppError::Configuration)
            .context("invalid sync configuration")?;

        let (durable, db_pool) = build_store(&config).await?;
        let action_log = Arc::new(ActionLog::new(durable, memory_store()));

        let sync_engine = Arc::new(SyncEngine::new(
            action_log.clone(),
            replayer,
            connectivity.clone(),
            SyncEngineConfig::from(&config.sync),
        ));
        let status_monitor = Arc::new(SyncStatusMonitor::new(
            connectivity.clone(),
            action_log.clone(),
            sync_engine.clone(),
        ));
        let mutation_router = Arc::new(MutationRouter::new(
            action_log.clone(),
            connectivity.clone(),
        ));
        let sync_handler = Arc::new(SyncHandler::new(
            status_monitor.clone(),
            sync_engine.clone(),
            action_log.clone(),
        ));

        tracing::info!(
            target: "sync::engine",
            backend = ?config.storage.backend,
            durable = db_pool.is_some() || config.storage.backend == StorageBackend::File,
            "sync core initialised"
        );

        Ok(Self {
            config: Arc::new(config),
            action_log,
            sync_engine,
            status_monitor,
            mutation_router,
            sync_handler,
            connectivity,
            db_pool,
        })
    }

    /// `auto_sync` が有効な場合のみスケジューラを起動する
    pub async fn start(&self) -> bool {
        if !self.config.sync.auto_sync {
            tracing::info!(target: "sync::engine", "auto sync disabled; scheduler not started");
            return false;
        }
        self.sync_engine.start().await
    }

    pub async fn shutdown(&self) {
        self.sync_engine.stop().await;
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
    }
}

async fn build_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn ActionLogStore>, Option<ConnectionPool>)> {
    match config.storage.backend {
        StorageBackend::Sqlite => match open_sqlite(config).await {
            Ok(pool) => {
                let store: Arc<dyn ActionLogStore> =
                    Arc::new(SqliteActionLogStore::new(pool.get_pool().clone()));
                Ok((store, Some(pool)))
            }
            Err(err) => {
                tracing::warn!(
                    target: "sync::store",
                    error = %err,
                    "could not open action log database; running without persistence"
                );
                Ok((memory_store(), None))
            }
        },
        StorageBackend::File => {
            let dir = config.data_dir();
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("failed to create data directory {}", dir.display()))?;
            let store: Arc<dyn ActionLogStore> = Arc::new(JsonFileActionLogStore::new(dir));
            Ok((store, None))
        }
        StorageBackend::Memory => Ok((memory_store(), None)),
    }
}

fn memory_store() -> Arc<dyn ActionLogStore> {
    Arc::new(InMemoryActionLogStore::new())
}

async fn open_sqlite(config: &AppConfig) -> Result<ConnectionPool, AppError> {
    let pool = ConnectionPool::from_config(&config.database).await?;
    pool.migrate().await?;
    Ok(pool)
}
