use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StorageBackend::Sqlite),
            "file" | "json" => Some(StorageBackend::File),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval: u64,
    /// 0 の場合はデッドレター化せず無期限に再試行する
    pub max_attempts: u32,
    pub replay_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// 疎通確認先 (`host:port`)。未設定ならホスト側が接続状態を通知する
    pub probe_address: Option<String>,
    pub probe_interval: u64,
    pub probe_timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        let db_path = data_dir.join("sync.db");

        Self {
            database: DatabaseConfig {
                url: format!("sqlite://{}?mode=rwc", db_path.display()),
                max_connections: 5,
                connection_timeout: 30,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 30,
                max_attempts: 5,
                replay_timeout: 15,
            },
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
                data_dir: data_dir.display().to_string(),
            },
            network: NetworkConfig {
                probe_address: None,
                probe_interval: 5,
                probe_timeout: 3,
            },
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval)
    }

    pub fn replay_timeout(&self) -> Duration {
        Duration::from_secs(self.replay_timeout)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 環境変数相当のルックアップ関数から設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("FIELDOPS_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = lookup("FIELDOPS_DATABASE_MAX_CONNECTIONS").and_then(|v| parse_u32(&v))
        {
            cfg.database.max_connections = value;
        }

        if let Some(v) = lookup("FIELDOPS_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = lookup("FIELDOPS_SYNC_INTERVAL_SECS").and_then(|v| parse_u64(&v)) {
            cfg.sync.sync_interval = value;
        }
        if let Some(value) = lookup("FIELDOPS_SYNC_MAX_ATTEMPTS").and_then(|v| parse_u32(&v)) {
            cfg.sync.max_attempts = value;
        }
        if let Some(value) = lookup("FIELDOPS_REPLAY_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.sync.replay_timeout = value;
        }

        if let Some(backend) = lookup("FIELDOPS_STORAGE_BACKEND").and_then(|v| StorageBackend::parse(&v))
        {
            cfg.storage.backend = backend;
        }
        if let Some(v) = lookup("FIELDOPS_DATA_DIR") {
            if !v.trim().is_empty() {
                cfg.storage.data_dir = v.trim().to_string();
            }
        }

        if let Some(v) = lookup("FIELDOPS_PROBE_ADDRESS") {
            let trimmed = v.trim();
            cfg.network.probe_address = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(value) = lookup("FIELDOPS_PROBE_INTERVAL_SECS").and_then(|v| parse_u64(&v)) {
            cfg.network.probe_interval = value;
        }
        if let Some(value) = lookup("FIELDOPS_PROBE_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.network.probe_timeout = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.sync_interval == 0 {
            return Err("Sync interval must be greater than 0".to_string());
        }
        if self.sync.replay_timeout == 0 {
            return Err("Replay timeout must be greater than 0".to_string());
        }
        if self.network.probe_address.is_some() {
            if self.network.probe_interval == 0 {
                return Err("Probe interval must be greater than 0".to_string());
            }
            if self.network.probe_timeout == 0 {
                return Err("Probe timeout must be greater than 0".to_string());
            }
        }
        if let Some(address) = &self.network.probe_address {
            if address.trim().is_empty() {
                return Err("Probe address cannot be empty".to_string());
            }
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("fieldops");
    path
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}
