//! Hybrid retrieval orchestrator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use devdocs_index::{
    CorpusProvider, IndexManager, IndexedDocument, PersistentIndex, QueryEngine,
};
use devdocs_sources::{KnowledgeSource, LOCAL_SOURCE_LABEL, RetrievedKnowledge};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::intent::{Intent, IntentClassifier};

/// Observable retrieval state for UI polling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalState {
    /// The most recent query passed to `retrieve`.
    pub last_query: Option<String>,

    /// Whether any retrieval is in progress.
    pub is_retrieving: bool,
}

/// Combines local index results with external sources selected by intent.
///
/// Holds no per-query state besides [`RetrievalState`]; share one instance
/// behind an `Arc`.
pub struct RetrievalOrchestrator {
    /// Owner of the local index.
    manager: Arc<IndexManager>,

    /// Local ranking.
    engine: QueryEngine,

    /// Intent detection.
    classifier: IntentClassifier,

    /// Registered external sources.
    sources: Vec<Arc<dyn KnowledgeSource>>,

    /// Toggles, budgets and deadlines.
    config: RetrievalConfig,

    /// Last query and busy flag.
    state_tx: watch::Sender<RetrievalState>,

    /// Retrievals currently running.
    active: AtomicUsize,
}

impl RetrievalOrchestrator {
    /// Create an orchestrator builder.
    pub fn builder(manager: Arc<IndexManager>) -> RetrievalOrchestratorBuilder {
        RetrievalOrchestratorBuilder::new(manager)
    }

    /// The index manager backing local search.
    pub fn manager(&self) -> &Arc<IndexManager> {
        &self.manager
    }

    /// The active configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Snapshot of the retrieval state.
    pub fn state(&self) -> RetrievalState {
        self.state_tx.borrow().clone()
    }

    /// Watch the retrieval state.
    pub fn subscribe(&self) -> watch::Receiver<RetrievalState> {
        self.state_tx.subscribe()
    }

    /// Make sure the index matches the corpus from `provider`.
    pub async fn refresh_index(
        &self,
        provider: &dyn CorpusProvider,
    ) -> Result<Arc<PersistentIndex>> {
        Ok(self.manager.refresh(provider).await?)
    }

    /// Search the local index only. Empty if no index is installed.
    pub fn search(&self, query: &str, limit: usize) -> Vec<IndexedDocument> {
        let Some(index) = self.manager.current() else {
            debug!("No index installed; local search is empty");
            return Vec::new();
        };
        self.engine
            .search(&index, query, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Local and external results for `query`, best first, at most `limit`.
    pub async fn retrieve(&self, query: &str, limit: usize) -> Vec<RetrievedKnowledge> {
        self.retrieve_with_cancel(query, limit, &CancellationToken::new())
            .await
    }

    /// Like [`RetrievalOrchestrator::retrieve`], abandoning outstanding
    /// source calls once `cancel` fires. Local results and any source
    /// results that already arrived are still returned.
    pub async fn retrieve_with_cancel(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Vec<RetrievedKnowledge> {
        let _busy = self.begin(query);

        let local = self.local_results(query);
        let intent = self.classifier.classify(query);
        let selected = self.select_sources(intent);
        debug!(
            "Retrieving {query:?}: intent {intent}, {} local results, {} sources",
            local.len(),
            selected.len()
        );

        let external = self.fan_out(query, selected, cancel).await;

        let mut merged = local;
        merged.extend(external.into_iter().flatten());
        // Stable: equal scores keep local-then-table order.
        merged.sort_by_key(|k| std::cmp::Reverse(OrderedFloat(k.relevance_score)));
        merged.truncate(limit);

        info!("Retrieved {} results for {query:?}", merged.len());
        merged
    }

    fn begin(&self, query: &str) -> BusyGuard<'_> {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.state_tx.send_modify(|state| {
            state.last_query = Some(query.to_string());
            state.is_retrieving = true;
        });
        BusyGuard { orchestrator: self }
    }

    /// Local hits scored relative to the best local hit, so the top local
    /// result scores 1.0.
    fn local_results(&self, query: &str) -> Vec<RetrievedKnowledge> {
        let Some(index) = self.manager.current() else {
            return Vec::new();
        };
        let scored = self
            .engine
            .search_scored(&index, query, self.config.local_limit);
        let Some(top) = scored.first().map(|r| r.score.max(1)) else {
            return Vec::new();
        };

        scored
            .iter()
            .filter_map(|result| {
                let doc = index.document(&result.document_id)?;
                Some(RetrievedKnowledge {
                    source_label: LOCAL_SOURCE_LABEL.to_string(),
                    title: doc.title.clone(),
                    content: doc.summary.clone(),
                    relevance_score: result.score as f32 / top as f32,
                    url: (!doc.url.is_empty()).then(|| doc.url.clone()),
                })
            })
            .collect()
    }

    /// Sources to consult for `intent`, each with its result budget, in
    /// merge order.
    fn select_sources(&self, intent: Intent) -> Vec<(Arc<dyn KnowledgeSource>, usize)> {
        let mut selected = Vec::new();
        for &kind in intent.source_kinds() {
            if !self.config.sources.is_enabled(kind) {
                debug!("Skipping disabled {kind} sources");
                continue;
            }
            let budget = self.config.budgets.get(kind);
            if budget == 0 {
                continue;
            }
            for source in &self.sources {
                if source.kind() == kind && source.is_available() {
                    selected.push((Arc::clone(source), budget));
                }
            }
        }
        selected
    }

    /// Query every selected source concurrently. Returns one slot per
    /// source, in selection order; failed, timed out or cancelled sources
    /// leave their slot empty.
    async fn fan_out(
        &self,
        query: &str,
        selected: Vec<(Arc<dyn KnowledgeSource>, usize)>,
        cancel: &CancellationToken,
    ) -> Vec<Vec<RetrievedKnowledge>> {
        let mut slots = vec![Vec::new(); selected.len()];
        if selected.is_empty() {
            return slots;
        }

        let deadline = self.config.source_timeout();
        let mut join_set = JoinSet::new();
        for (slot, (source, budget)) in selected.into_iter().enumerate() {
            let query = query.to_string();
            join_set.spawn(async move {
                let result = tokio::time::timeout(deadline, source.fetch(&query, budget)).await;
                (slot, source.name().to_string(), budget, result)
            });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Retrieval cancelled; abandoning {} sources", join_set.len());
                    join_set.abort_all();
                    break;
                }
                joined = join_set.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    match joined {
                        Ok((slot, _, budget, Ok(Ok(mut results)))) => {
                            results.truncate(budget);
                            for result in &mut results {
                                if !result.relevance_score.is_finite() {
                                    result.relevance_score = 0.0;
                                }
                            }
                            if let Some(target) = slots.get_mut(slot) {
                                *target = results;
                            }
                        }
                        Ok((_, name, _, Ok(Err(e)))) => {
                            warn!(source = %name, "Knowledge source failed: {e}");
                        }
                        Ok((_, name, _, Err(_))) => {
                            warn!(source = %name, "Knowledge source timed out after {deadline:?}");
                        }
                        Err(e) => {
                            warn!("Knowledge source task failed: {e}");
                        }
                    }
                }
            }
        }

        slots
    }
}

impl std::fmt::Debug for RetrievalOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalOrchestrator")
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("state", &*self.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

/// Clears the busy flag when the last concurrent retrieval ends, including
/// when the retrieval future is dropped.
struct BusyGuard<'a> {
    orchestrator: &'a RetrievalOrchestrator,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.orchestrator.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.orchestrator
                .state_tx
                .send_modify(|state| state.is_retrieving = false);
        }
    }
}

/// Builder for [`RetrievalOrchestrator`].
pub struct RetrievalOrchestratorBuilder {
    manager: Arc<IndexManager>,
    config: RetrievalConfig,
    sources: Vec<Arc<dyn KnowledgeSource>>,
    classifier: IntentClassifier,
}

impl RetrievalOrchestratorBuilder {
    /// Create a new builder.
    pub fn new(manager: Arc<IndexManager>) -> Self {
        Self {
            manager,
            config: RetrievalConfig::default(),
            sources: Vec::new(),
            classifier: IntentClassifier::new(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an external source.
    pub fn with_source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Register several external sources.
    pub fn with_sources(
        mut self,
        sources: impl IntoIterator<Item = Arc<dyn KnowledgeSource>>,
    ) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> RetrievalOrchestrator {
        let (state_tx, _) = watch::channel(RetrievalState::default());
        info!(
            "Retrieval orchestrator ready with {} external sources",
            self.sources.len()
        );
        RetrievalOrchestrator {
            manager: self.manager,
            engine: QueryEngine::new(),
            classifier: self.classifier,
            sources: self.sources,
            config: self.config,
            state_tx,
            active: AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use devdocs_index::{Document, IndexBuilder, IndexStore};
    use devdocs_sources::{SourceError, SourceKind};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct FixedSource {
        name: &'static str,
        kind: SourceKind,
        scores: Vec<f32>,
    }

    #[async_trait]
    impl KnowledgeSource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(
            &self,
            _query: &str,
            _limit: usize,
        ) -> devdocs_sources::Result<Vec<RetrievedKnowledge>> {
            if self.scores.is_empty() {
                return Err(SourceError::ApiRequest("unavailable".to_string()));
            }
            Ok(self
                .scores
                .iter()
                .enumerate()
                .map(|(i, score)| {
                    RetrievedKnowledge::new(self.name, format!("{}-{i}", self.name), "", *score)
                })
                .collect())
        }
    }

    async fn manager(dir: &TempDir) -> Arc<IndexManager> {
        let manager = Arc::new(IndexManager::new(
            IndexStore::new(dir.path().join("index.json")),
            IndexBuilder::new(),
        ));
        let corpus = vec![
            Document::new("layout", "Layout grids", "Foundations")
                .with_summary("Grids align **content**")
                .with_url("https://example.com/layout"),
            Document::new("lists", "Lists and tables", "Components")
                .with_summary("Lists show rows of content"),
        ];
        manager.refresh(&corpus).await.unwrap();
        manager
    }

    fn source(name: &'static str, kind: SourceKind, scores: Vec<f32>) -> Arc<dyn KnowledgeSource> {
        Arc::new(FixedSource { name, kind, scores })
    }

    #[tokio::test]
    async fn test_local_scores_are_normalized() {
        let dir = TempDir::new().unwrap();
        let orchestrator = RetrievalOrchestrator::builder(manager(&dir).await)
            .with_config(RetrievalConfig::new(dir.path()))
            .build();

        let results = orchestrator.retrieve("content grids", 10).await;
        assert_eq!(results[0].title, "Layout grids");
        assert_eq!(results[0].relevance_score, 1.0);
        assert_eq!(results[0].url.as_deref(), Some("https://example.com/layout"));
        assert!(results.iter().all(|r| r.is_local()));
        assert!(results.iter().all(|r| r.relevance_score > 0.0 && r.relevance_score <= 1.0));
    }

    #[tokio::test]
    async fn test_only_mapped_and_enabled_sources_run() {
        let dir = TempDir::new().unwrap();
        let config = RetrievalConfig::new(dir.path())
            .with_source_enabled(SourceKind::FrameworkDocs, false);
        let orchestrator = RetrievalOrchestrator::builder(manager(&dir).await)
            .with_config(config)
            .with_source(source("lang", SourceKind::LanguageDocs, vec![0.5]))
            .with_source(source("framework", SourceKind::FrameworkDocs, vec![0.5]))
            .with_source(source("packages", SourceKind::PackageIndex, vec![0.5]))
            .build();

        // swiftLanguage maps to language + framework docs; framework is off.
        let results = orchestrator.retrieve("swift generics", 10).await;
        let labels: Vec<&str> = results.iter().map(|r| r.source_label.as_str()).collect();
        assert_eq!(labels, vec!["lang"]);
    }

    #[tokio::test]
    async fn test_merge_sorts_by_score_and_respects_budget() {
        let dir = TempDir::new().unwrap();
        let config = RetrievalConfig::new(dir.path()).with_budget(SourceKind::CodeExamples, 2);
        let orchestrator = RetrievalOrchestrator::builder(manager(&dir).await)
            .with_config(config)
            .with_source(source("examples", SourceKind::CodeExamples, vec![0.4, 2.0, 9.0]))
            .with_source(source("framework", SourceKind::FrameworkDocs, vec![0.7]))
            .build();

        let results = orchestrator.retrieve("create a list component", 10).await;
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["examples-1", "Lists and tables", "framework-0", "examples-0"]
        );
    }

    #[tokio::test]
    async fn test_failing_source_is_dropped() {
        let dir = TempDir::new().unwrap();
        let orchestrator = RetrievalOrchestrator::builder(manager(&dir).await)
            .with_config(RetrievalConfig::new(dir.path()))
            .with_source(source("broken", SourceKind::Community, Vec::new()))
            .build();

        let results = orchestrator.retrieve("lists rows", 5).await;
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.is_local()));
    }

    #[tokio::test]
    async fn test_state_tracks_last_query() {
        let dir = TempDir::new().unwrap();
        let orchestrator = RetrievalOrchestrator::builder(manager(&dir).await)
            .with_config(RetrievalConfig::new(dir.path()))
            .build();
        assert_eq!(orchestrator.state(), RetrievalState::default());

        orchestrator.retrieve("grids", 3).await;
        assert_eq!(
            orchestrator.state(),
            RetrievalState {
                last_query: Some("grids".to_string()),
                is_retrieving: false,
            }
        );
    }

    #[tokio::test]
    async fn test_search_without_index_is_empty() {
        let dir = TempDir::new().unwrap();
        let manager = Arc::new(IndexManager::new(
            IndexStore::new(dir.path().join("index.json")),
            IndexBuilder::new(),
        ));
        let orchestrator = RetrievalOrchestrator::builder(manager).build();
        assert!(orchestrator.search("anything", 5).is_empty());
        assert!(orchestrator.retrieve("anything", 5).await.is_empty());
    }
}
