//! # Documentation Index
//!
//! This crate turns a corpus of structured documentation topics into a
//! persistent, searchable index. It provides:
//!
//! - **Indexing**: Keyword, concept, category and platform extraction per topic
//! - **Persistence**: A JSON index file validated by schema version and corpus fingerprint
//! - **Lifecycle**: Rebuild-only-when-stale management with observable build status
//! - **Querying**: Deterministic keyword and concept ranking
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Documentation Index                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CorpusProvider ──► IndexManager ──► IndexStore (index.json)    │
//! │                          │                                      │
//! │                          ▼                                      │
//! │  Document ──► IndexBuilder ──► PersistentIndex                  │
//! │                    │                   │                        │
//! │                    ▼                   ▼                        │
//! │            ConceptExtractor       QueryEngine                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devdocs_index::{IndexBuilder, IndexManager, IndexStore, QueryEngine};
//!
//! let manager = IndexManager::new(IndexStore::new("index.json"), IndexBuilder::new());
//! let index = manager.refresh(&corpus).await?;
//! let hits = QueryEngine::new().search(&index, "touch target", 5);
//! ```

pub mod builder;
pub mod document;
pub mod error;
pub mod extraction;
pub mod fingerprint;
pub mod index;
pub mod manager;
pub mod query;
pub mod storage;
pub mod tokenize;

pub use builder::{IndexBuilder, NoProgress, ProgressSink};
pub use document::{ContentBlock, Document, IndexedDocument, RelatedLink, Section};
pub use error::{IndexError, Result, StorageError};
pub use extraction::{ConceptExtractor, EmphasisExtractor};
pub use fingerprint::{content_hash, corpus_hash};
pub use index::{INDEX_SCHEMA_VERSION, IndexStats, PersistentIndex, PostingMap};
pub use manager::{BuildStatus, CorpusProvider, IndexManager};
pub use query::{QueryEngine, ScoredResult};
pub use storage::IndexStore;
pub use tokenize::tokenize;
