//! Keyword and concept ranking against a built index.
//!
//! Scoring, per query token `t`:
//!
//! 1. every document listed under `searchIndex[t]` gains [`TERM_WEIGHT`];
//! 2. for every indexed term that contains `t`, or is contained in `t`, each
//!    listed document gains [`PARTIAL_WEIGHT`] (an exact key counts here too);
//! 3. after all tokens have been through 1–2, every document listed under
//!    `conceptIndex[t]` gains [`CONCEPT_WEIGHT`].
//!
//! Documents are ordered by descending score. Ties keep the order in which
//! documents first received any score, which makes results reproducible for
//! a fixed index and query.

use std::cmp::Reverse;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::IndexedDocument;
use crate::index::PersistentIndex;
use crate::tokenize::tokenize;

/// Score for an exact term match.
pub const TERM_WEIGHT: u32 = 1;

/// Score for a substring match in either direction.
pub const PARTIAL_WEIGHT: u32 = 1;

/// Score for a concept match.
pub const CONCEPT_WEIGHT: u32 = 3;

/// A document id with its accumulated score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// The matching document id.
    pub document_id: String,

    /// Accumulated relevance score.
    pub score: u32,
}

/// Ranks documents in a [`PersistentIndex`] against free-text queries.
///
/// The engine holds no state; any number of searches may run concurrently
/// against the same index.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryEngine;

impl QueryEngine {
    /// Create a new query engine.
    pub fn new() -> Self {
        Self
    }

    /// Return up to `limit` documents best matching `query`.
    pub fn search<'a>(
        &self,
        index: &'a PersistentIndex,
        query: &str,
        limit: usize,
    ) -> Vec<&'a IndexedDocument> {
        self.search_scored(index, query, limit)
            .iter()
            .filter_map(|result| index.document(&result.document_id))
            .collect()
    }

    /// Like [`QueryEngine::search`], but keeps the scores.
    pub fn search_scored(
        &self,
        index: &PersistentIndex,
        query: &str,
        limit: usize,
    ) -> Vec<ScoredResult> {
        if limit == 0 {
            return Vec::new();
        }

        let tokens: Vec<String> = tokenize(query).collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scores: IndexMap<&str, u32> = IndexMap::new();

        for token in &tokens {
            if let Some(ids) = index.term_index.get(token) {
                accumulate(&mut scores, ids, TERM_WEIGHT);
            }

            for (key, ids) in &index.term_index {
                if key.contains(token.as_str()) || token.contains(key.as_str()) {
                    accumulate(&mut scores, ids, PARTIAL_WEIGHT);
                }
            }
        }

        for token in &tokens {
            if let Some(ids) = index.concept_index.get(token) {
                accumulate(&mut scores, ids, CONCEPT_WEIGHT);
            }
        }

        let mut ranked: Vec<ScoredResult> = scores
            .into_iter()
            .map(|(id, score)| ScoredResult {
                document_id: id.to_string(),
                score,
            })
            .collect();
        // Stable sort: equal scores keep first-seen order.
        ranked.sort_by_key(|result| Reverse(result.score));
        ranked.truncate(limit);

        debug!(
            "Scored query {query:?}: {} tokens, {} results",
            tokens.len(),
            ranked.len()
        );
        ranked
    }
}

fn accumulate<'a>(scores: &mut IndexMap<&'a str, u32>, ids: &'a [String], weight: u32) {
    for id in ids {
        *scores.entry(id.as_str()).or_insert(0) += weight;
    }
}
