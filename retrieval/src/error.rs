//! Error types for the retrieval layer.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while configuring or running retrieval.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Index error.
    #[error("index error: {0}")]
    Index(#[from] devdocs_index::IndexError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
