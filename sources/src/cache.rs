//! Response cache for knowledge sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::knowledge::RetrievedKnowledge;
use crate::source::{KnowledgeSource, SourceKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    limit: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    results: Vec<RetrievedKnowledge>,
    inserted_at: Instant,
    sequence: u64,
}

/// A wrapper that caches successful responses of another source.
///
/// Entries are keyed by query and limit. At capacity the oldest entry is
/// evicted. Failed fetches are never cached.
pub struct CachedSource<S> {
    source: S,

    /// In-memory cache.
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,

    /// Maximum cache size.
    max_entries: usize,

    /// Entries older than this are refetched.
    ttl: Option<Duration>,

    /// Insertion counter; the lowest live value is the oldest entry.
    next_sequence: AtomicU64,
}

impl<S: KnowledgeSource> CachedSource<S> {
    /// Create a new cached source holding at most `max_entries` responses.
    pub fn new(source: S, max_entries: usize) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            ttl: None,
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Expire entries after `ttl`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.source
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.ttl.is_none_or(|ttl| entry.inserted_at.elapsed() < ttl)
    }

    async fn get(&self, key: &CacheKey) -> Option<Vec<RetrievedKnowledge>> {
        let cache = self.cache.read().await;
        cache
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.results.clone())
    }

    async fn put(&self, key: CacheKey, results: Vec<RetrievedKnowledge>) {
        let mut cache = self.cache.write().await;

        if !cache.contains_key(&key) && cache.len() >= self.max_entries {
            if let Some(oldest_key) = cache
                .iter()
                .min_by_key(|(_, v)| v.sequence)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest_key);
            }
        }

        cache.insert(
            key,
            CacheEntry {
                results,
                inserted_at: Instant::now(),
                sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    /// Clear the entire cache.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
        info!("Cleared response cache for {}", self.source.name());
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.read().await.len(),
            max_entries: self.max_entries,
        }
    }
}

#[async_trait]
impl<S: KnowledgeSource> KnowledgeSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    fn is_available(&self) -> bool {
        self.source.is_available()
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RetrievedKnowledge>> {
        let key = CacheKey {
            query: query.to_string(),
            limit,
        };

        if let Some(results) = self.get(&key).await {
            debug!("Cache hit for {} ({query:?})", self.source.name());
            return Ok(results);
        }

        let results = self.source.fetch(query, limit).await?;
        self.put(key, results.clone()).await;
        Ok(results)
    }
}

/// Statistics about a response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Maximum cache size.
    pub max_entries: usize,
}
