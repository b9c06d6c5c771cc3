use crate::domain::value_objects::offline::EntityKind;
use thiserror::Error;

/// SQLite の SQLITE_FULL (ディスク/DB容量不足)
const SQLITE_FULL_CODE: &str = "13";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage full: {0}")]
    StorageFull(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mutation already in flight for {0}")]
    MutationInFlight(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// UI へ返す機械可読なエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::StorageFull(_) => "STORAGE_FULL",
            AppError::Remote(_) => "REMOTE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::MutationInFlight(_) => "MUTATION_IN_FLIGHT",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::Storage(_) | AppError::StorageFull(_))
    }

    /// ネットワーク断やタイムアウトなど、再送で回復しうるリモートエラーか
    pub fn is_transient_remote(&self) -> bool {
        match self {
            AppError::Remote(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// リモートバックエンドへの再送・直接呼び出しの失敗
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network unavailable: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("no replayer registered for {0}")]
    Unsupported(EntityKind),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Timeout)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(SQLITE_FULL_CODE) {
                return AppError::StorageFull(db_err.message().to_string());
            }
        }
        AppError::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::StorageFull {
            AppError::StorageFull(err.to_string())
        } else {
            AppError::Storage(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
