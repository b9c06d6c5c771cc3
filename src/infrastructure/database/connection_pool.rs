use crate::shared::config::DatabaseConfig;
use crate::shared::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ConnectionPool {
    pool: Arc<SqlitePool>,
}

impl ConnectionPool {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        Self::connect(database_url, max_connections, None).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, AppError> {
        Self::connect(
            &config.url,
            config.max_connections,
            Some(Duration::from_secs(config.connection_timeout)),
        )
        .await
    }

    pub async fn from_memory() -> Result<Self, AppError> {
        Self::new("sqlite::memory:", 1).await
    }

    async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // ファイル DB の場合は親ディレクトリを先に用意する
        let filename = options.get_filename();
        if filename != std::path::Path::new(":memory:") {
            if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if let Some(timeout) = acquire_timeout {
            pool_options = pool_options.acquire_timeout(timeout);
        }
        let pool = pool_options.connect_with(options).await?;

        tracing::debug!(target: "sync::store", url = database_url, "database pool opened");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
