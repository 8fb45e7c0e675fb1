//! Storage error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("atomic rename failed: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("project not found: {0}")]
    ProjectNotFound(String),
}
