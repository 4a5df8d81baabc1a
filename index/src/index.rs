//! The persisted inverted index.
//!
//! A `PersistentIndex` is built once per corpus version and is immutable
//! afterwards: queries borrow it, rebuilds replace it wholesale.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::IndexedDocument;

/// Schema version compiled into this engine. Stored indexes with any other
/// version are treated as a cache miss.
pub const INDEX_SCHEMA_VERSION: &str = "2";

/// Inverted map from a key to the ids of documents containing it, in the
/// order documents were indexed.
pub type PostingMap = IndexMap<String, Vec<String>>;

/// A built index over a corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentIndex {
    /// Schema version this index was written with.
    pub version: String,

    /// When the index was built.
    pub created_at: DateTime<Utc>,

    /// Fingerprint of the corpus the index was built from.
    pub source_hash: String,

    /// Number of indexed documents.
    #[serde(rename = "topicCount")]
    pub document_count: usize,

    /// Per-document summary records.
    pub documents: Vec<IndexedDocument>,

    /// Term to document ids.
    #[serde(rename = "searchIndex")]
    pub term_index: PostingMap,

    /// Case-folded concept to document ids.
    pub concept_index: PostingMap,

    /// Category to document ids.
    pub category_index: PostingMap,

    #[serde(skip)]
    positions: OnceLock<HashMap<String, usize>>,
}

impl PersistentIndex {
    /// Assemble an index from its parts, stamped with the current schema
    /// version and time.
    pub fn new(
        source_hash: impl Into<String>,
        documents: Vec<IndexedDocument>,
        term_index: PostingMap,
        concept_index: PostingMap,
        category_index: PostingMap,
    ) -> Self {
        Self {
            version: INDEX_SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
            source_hash: source_hash.into(),
            document_count: documents.len(),
            documents,
            term_index,
            concept_index,
            category_index,
            positions: OnceLock::new(),
        }
    }

    /// Whether this index was written by the current schema.
    pub fn is_current_schema(&self) -> bool {
        self.version == INDEX_SCHEMA_VERSION
    }

    /// Look up a document by id.
    pub fn document(&self, id: &str) -> Option<&IndexedDocument> {
        let positions = self.positions.get_or_init(|| {
            self.documents
                .iter()
                .enumerate()
                .map(|(pos, doc)| (doc.id.clone(), pos))
                .collect()
        });
        positions.get(id).and_then(|&pos| self.documents.get(pos))
    }

    /// All categories, in first-indexed order.
    pub fn categories(&self) -> Vec<&str> {
        self.category_index.keys().map(String::as_str).collect()
    }

    /// Documents in a category, in indexing order.
    pub fn documents_in_category(&self, category: &str) -> Vec<&IndexedDocument> {
        self.resolve(self.category_index.get(category))
    }

    /// Related topics of a document that exist in this index.
    pub fn related(&self, id: &str) -> Vec<&IndexedDocument> {
        self.document(id)
            .map(|doc| {
                doc.related_ids
                    .iter()
                    .filter_map(|related| self.document(related))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resolve(&self, ids: Option<&Vec<String>>) -> Vec<&IndexedDocument> {
        ids.map(|ids| ids.iter().filter_map(|id| self.document(id)).collect())
            .unwrap_or_default()
    }

    /// Verify the structural invariants of the index.
    ///
    /// Returns a description of the first violation found.
    pub fn check_integrity(&self) -> std::result::Result<(), String> {
        if self.document_count != self.documents.len() {
            return Err(format!(
                "document count {} does not match {} stored documents",
                self.document_count,
                self.documents.len()
            ));
        }

        let mut ids = HashSet::with_capacity(self.documents.len());
        for doc in &self.documents {
            if !ids.insert(doc.id.as_str()) {
                return Err(format!("duplicate document id: {}", doc.id));
            }
        }

        let maps = [
            ("searchIndex", &self.term_index),
            ("conceptIndex", &self.concept_index),
            ("categoryIndex", &self.category_index),
        ];
        for (name, map) in maps {
            for (key, postings) in map {
                if let Some(missing) = postings.iter().find(|id| !ids.contains(id.as_str())) {
                    return Err(format!("{name}[{key}] references unknown document {missing}"));
                }
            }
        }

        Ok(())
    }

    /// Get statistics about the index.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            document_count: self.documents.len(),
            term_count: self.term_index.len(),
            concept_count: self.concept_index.len(),
            category_count: self.category_index.len(),
        }
    }
}

/// Statistics about a built index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub term_count: usize,
    pub concept_count: usize,
    pub category_count: usize,
}
