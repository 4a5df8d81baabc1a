//! # Knowledge Sources
//!
//! Adapters for external knowledge sources consulted alongside the local
//! documentation index:
//!
//! - **KnowledgeSource**: the async adapter interface, one implementation per backend
//! - **HttpSource**: a generic JSON search endpoint adapter
//! - **CachedSource**: bounded response caching around any source
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devdocs_sources::{CachedSource, HttpSource, KnowledgeSource, SourceKind};
//!
//! let forums = CachedSource::new(
//!     HttpSource::new("forums", SourceKind::Community, "https://search.example.com/q"),
//!     256,
//! );
//! let hits = forums.fetch("async let", 5).await?;
//! ```

pub mod cache;
pub mod error;
pub mod http;
pub mod knowledge;
pub mod source;

pub use cache::{CacheStats, CachedSource};
pub use error::{Result, SourceError};
pub use http::HttpSource;
pub use knowledge::{LOCAL_SOURCE_LABEL, RetrievedKnowledge};
pub use source::{KnowledgeSource, SourceKind};
