//! Retrieval results.

use serde::{Deserialize, Serialize};

/// Label of results produced by the local index.
pub const LOCAL_SOURCE_LABEL: &str = "local";

/// One piece of knowledge returned by the local index or an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedKnowledge {
    /// Name of the source that produced this result.
    pub source_label: String,

    pub title: String,

    pub content: String,

    /// Ranking signal; only meaningful relative to other results.
    pub relevance_score: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RetrievedKnowledge {
    /// Create a result without a URL.
    pub fn new(
        source_label: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        relevance_score: f32,
    ) -> Self {
        Self {
            source_label: source_label.into(),
            title: title.into(),
            content: content.into(),
            relevance_score,
            url: None,
        }
    }

    /// Set the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Whether this result came from the local index.
    pub fn is_local(&self) -> bool {
        self.source_label == LOCAL_SOURCE_LABEL
    }
}
