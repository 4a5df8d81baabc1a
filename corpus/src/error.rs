//! Error types for corpus loading and watching.

use thiserror::Error;

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Errors that can occur while loading or watching a corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Corpus directory not found.
    #[error("corpus directory not found: {0}")]
    NotFound(String),

    /// Path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Walking the directory failed.
    #[error("failed to walk corpus directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A topic file is not valid topic JSON.
    #[error("invalid topic file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The blocking load task failed.
    #[error("corpus load task failed: {0}")]
    Task(String),
}

impl From<CorpusError> for devdocs_index::IndexError {
    fn from(err: CorpusError) -> Self {
        devdocs_index::IndexError::CorpusUnavailable(err.to_string())
    }
}
