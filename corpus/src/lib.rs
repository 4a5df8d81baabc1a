//! # Corpus
//!
//! Loads documentation topics from a directory of JSON files and watches
//! that directory for changes, so a host can keep the index fresh.
//!
//! ```rust,ignore
//! use devdocs_corpus::{CorpusWatcher, DirectoryCorpus};
//!
//! let corpus = DirectoryCorpus::new("~/devdocs/topics");
//! manager.refresh(&corpus).await?;
//!
//! let mut watcher = CorpusWatcher::start(corpus.root())?;
//! while let Some(_change) = watcher.recv().await {
//!     manager.refresh(&corpus).await?;
//! }
//! ```

pub mod error;
pub mod loader;
pub mod watcher;

pub use error::{CorpusError, Result};
pub use loader::{CorpusScan, DirectoryCorpus, TOPIC_EXTENSION};
pub use watcher::{CorpusEvent, CorpusEventKind, CorpusWatcher};
