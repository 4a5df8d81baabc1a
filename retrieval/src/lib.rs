//! # Hybrid Retrieval
//!
//! Answers natural-language questions by combining the local documentation
//! index with external knowledge sources chosen by query intent.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     RetrievalOrchestrator                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   query ──► QueryEngine (local index, always)                   │
//! │     │                                                           │
//! │     └────► IntentClassifier ──► intent → source kinds           │
//! │                                      │                          │
//! │                ┌─────────────────────┼─────────────────────┐    │
//! │                ▼                     ▼                     ▼    │
//! │         KnowledgeSource       KnowledgeSource       KnowledgeSource
//! │         (timeout, cancel)     (timeout, cancel)     (timeout, cancel)
//! │                └─────────────────────┼─────────────────────┘    │
//! │                                      ▼                          │
//! │                      merge ──► sort by score ──► truncate       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devdocs_retrieval::{RetrievalConfig, RetrievalOrchestrator};
//!
//! let config = RetrievalConfig::load(RetrievalConfig::default_path())?;
//! let orchestrator = RetrievalOrchestrator::builder(manager)
//!     .with_sources(config.build_sources())
//!     .with_config(config)
//!     .build();
//!
//! let results = orchestrator.retrieve("how do I build a component", 5).await;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod intent;

pub use config::{CacheConfig, HttpSourceConfig, RetrievalConfig, SourceBudgets, SourceToggles};
pub use engine::{RetrievalOrchestrator, RetrievalOrchestratorBuilder, RetrievalState};
pub use error::{Result, RetrievalError};
pub use intent::{Intent, IntentClassifier};

// Re-export from dependencies for convenience
pub use devdocs_index::{BuildStatus, IndexManager, IndexedDocument};
pub use devdocs_sources::{KnowledgeSource, RetrievedKnowledge, SourceKind};
