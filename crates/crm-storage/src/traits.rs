//! Attachment store abstraction

use async_trait::async_trait;
use crm_core::models::Attachment;
use crm_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                AppError::NotFound(format!("Attachment not found: {}", key))
            }
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Content-addressed, write-once attachment storage
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store the attachment's bytes under its hashed filename.
    ///
    /// Returns `true` when the file was written and `false` when a complete
    /// file with that name already existed (identical content by construction).
    /// A stored file of the wrong size is treated as a torn write and replaced.
    async fn persist(&self, attachment: &Attachment) -> StorageResult<bool>;

    /// Read back the bytes stored under `hashed_filename`
    async fn read(&self, hashed_filename: &str) -> StorageResult<Vec<u8>>;

    async fn exists(&self, hashed_filename: &str) -> StorageResult<bool>;
}
