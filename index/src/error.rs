//! Error types for the documentation index.

use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building, storing or refreshing the index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The corpus could not be loaded, or was empty.
    #[error("corpus unavailable: {0}")]
    CorpusUnavailable(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The build was cancelled before it finished.
    #[error("index build cancelled")]
    Cancelled,

    /// A newer build replaced this one before it could be installed.
    #[error("index build superseded by a newer build")]
    Superseded,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to write the index file.
    #[error("failed to write file: {0}")]
    WriteFile(String),

    /// Failed to delete the index file.
    #[error("failed to delete file: {0}")]
    DeleteFile(String),
}
