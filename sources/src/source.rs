//! The knowledge source adapter interface.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::knowledge::RetrievedKnowledge;

/// Category of an external knowledge source.
///
/// The retrieval layer selects sources by kind, and configuration toggles
/// them by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Language reference and guides.
    LanguageDocs,

    /// Framework API documentation.
    FrameworkDocs,

    /// Sample code and snippets.
    CodeExamples,

    /// Package registry search.
    PackageIndex,

    /// Community Q&A and forums.
    Community,
}

impl SourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [SourceKind; 5] = [
        SourceKind::LanguageDocs,
        SourceKind::FrameworkDocs,
        SourceKind::CodeExamples,
        SourceKind::PackageIndex,
        SourceKind::Community,
    ];

    /// Stable snake_case name, as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::LanguageDocs => "language_docs",
            SourceKind::FrameworkDocs => "framework_docs",
            SourceKind::CodeExamples => "code_examples",
            SourceKind::PackageIndex => "package_index",
            SourceKind::Community => "community",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An external source of knowledge that can be queried with free text.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Name of this source, used as the result label.
    fn name(&self) -> &str;

    /// Category of this source.
    fn kind(&self) -> SourceKind;

    /// Check if the source can be queried (endpoint configured, key set, etc.).
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch up to `limit` results for `query`.
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RetrievedKnowledge>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_names_match_serde() {
        for kind in SourceKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
