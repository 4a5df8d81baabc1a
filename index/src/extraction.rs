//! Concept extraction from topic text.
//!
//! Concepts are emphasized spans (`**like this**`) that authors use to call
//! out the key idea of a paragraph. They rank higher than plain terms.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex_lite::Regex;

/// Pulls concept spans out of a block of text.
///
/// Implementations must never fail: text without recognizable markup, or
/// with unbalanced delimiters, simply yields fewer concepts.
pub trait ConceptExtractor: Send + Sync {
    /// Extract concept spans, verbatim and in first-seen order.
    fn extract_concepts(&self, text: &str) -> IndexSet<String>;
}

static EMPHASIS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+?)\*\*").ok());

/// Extracts spans wrapped in double asterisks.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmphasisExtractor;

impl EmphasisExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }
}

impl ConceptExtractor for EmphasisExtractor {
    fn extract_concepts(&self, text: &str) -> IndexSet<String> {
        let Some(pattern) = EMPHASIS.as_ref() else {
            return IndexSet::new();
        };

        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|span| !span.is_empty())
            .map(String::from)
            .collect()
    }
}
