//! End-to-end retrieval over a real index and fake or HTTP sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use devdocs_index::{Document, IndexBuilder, IndexManager, IndexStore};
use devdocs_retrieval::{HttpSourceConfig, RetrievalConfig, RetrievalOrchestrator};
use devdocs_sources::{KnowledgeSource, RetrievedKnowledge, SourceKind};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A source that answers after a delay.
struct DelayedSource {
    name: &'static str,
    kind: SourceKind,
    delay: Duration,
    score: f32,
    finished: AtomicBool,
}

impl DelayedSource {
    fn new(name: &'static str, kind: SourceKind, delay: Duration, score: f32) -> Arc<Self> {
        Arc::new(Self {
            name,
            kind,
            delay,
            score,
            finished: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl KnowledgeSource for DelayedSource {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(
        &self,
        query: &str,
        _limit: usize,
    ) -> devdocs_sources::Result<Vec<RetrievedKnowledge>> {
        tokio::time::sleep(self.delay).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(vec![RetrievedKnowledge::new(
            self.name,
            format!("{} on {query}", self.name),
            "external",
            self.score,
        )])
    }
}

async fn component_manager(dir: &TempDir) -> Arc<IndexManager> {
    let manager = Arc::new(IndexManager::new(
        IndexStore::new(dir.path().join("index.json")),
        IndexBuilder::new(),
    ));
    let corpus = vec![
        Document::new("custom-views", "Custom views", "Components")
            .with_summary("Compose a reusable **component** from smaller views"),
        Document::new("color", "Color usage", "Foundations").with_summary("Use semantic colors"),
    ];
    manager.refresh(&corpus).await.unwrap();
    manager
}

fn config(dir: &TempDir, timeout: Duration) -> RetrievalConfig {
    RetrievalConfig::new(dir.path()).with_source_timeout(timeout)
}

#[tokio::test]
async fn timed_out_source_does_not_fail_retrieval() {
    let dir = TempDir::new().unwrap();
    let slow = DelayedSource::new(
        "slow-examples",
        SourceKind::CodeExamples,
        Duration::from_secs(30),
        5.0,
    );
    let fast = DelayedSource::new(
        "framework",
        SourceKind::FrameworkDocs,
        Duration::from_millis(10),
        0.6,
    );
    let orchestrator = RetrievalOrchestrator::builder(component_manager(&dir).await)
        .with_config(config(&dir, Duration::from_millis(200)))
        .with_source(slow.clone())
        .with_source(fast.clone())
        .build();

    let results = orchestrator
        .retrieve("how do I build a component", 5)
        .await;

    let labels: Vec<&str> = results.iter().map(|r| r.source_label.as_str()).collect();
    assert_eq!(labels, vec!["local", "framework"]);
    assert_eq!(results[0].title, "Custom views");
    assert!(results.len() <= 5);
    assert!(!slow.finished.load(Ordering::SeqCst));
    assert!(!orchestrator.state().is_retrieving);
}

#[tokio::test]
async fn merge_order_ignores_arrival_order() {
    let dir = TempDir::new().unwrap();
    let manager = component_manager(&dir).await;

    // Same scores, opposite completion order.
    let run = |first_delay: u64, second_delay: u64| {
        let manager = Arc::clone(&manager);
        let config = config(&dir, Duration::from_secs(5));
        async move {
            let orchestrator = RetrievalOrchestrator::builder(manager)
                .with_config(config)
                .with_source(DelayedSource::new(
                    "examples",
                    SourceKind::CodeExamples,
                    Duration::from_millis(first_delay),
                    0.5,
                ))
                .with_source(DelayedSource::new(
                    "framework",
                    SourceKind::FrameworkDocs,
                    Duration::from_millis(second_delay),
                    0.5,
                ))
                .build();
            orchestrator
                .retrieve("create a component", 10)
                .await
                .into_iter()
                .map(|r| r.source_label)
                .collect::<Vec<_>>()
        }
    };

    let fast_first = run(1, 80).await;
    let slow_first = run(80, 1).await;
    assert_eq!(fast_first, slow_first);
    assert_eq!(fast_first, vec!["local", "examples", "framework"]);
}

#[tokio::test]
async fn cancellation_keeps_local_results() {
    let dir = TempDir::new().unwrap();
    let slow = DelayedSource::new(
        "slow-examples",
        SourceKind::CodeExamples,
        Duration::from_secs(30),
        5.0,
    );
    let orchestrator = Arc::new(
        RetrievalOrchestrator::builder(component_manager(&dir).await)
            .with_config(config(&dir, Duration::from_secs(60)))
            .with_source(slow.clone())
            .build(),
    );

    let cancel = CancellationToken::new();
    let task = {
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .retrieve_with_cancel("reusable component", 5, &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.state().is_retrieving);
    cancel.cancel();

    let results = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_local());
    assert!(!slow.finished.load(Ordering::SeqCst));
    assert!(!orchestrator.state().is_retrieving);
}

#[tokio::test]
async fn http_sources_from_config() {
    let dir = TempDir::new().unwrap();
    let examples = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                { "title": "Reusable card view", "content": "struct Card: View", "url": "https://examples.example.com/card" }
            ]
        })))
        .mount(&examples)
        .await;
    let framework = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&framework)
        .await;

    let config = config(&dir, Duration::from_secs(2))
        .with_http_source(HttpSourceConfig::new(
            "examples",
            SourceKind::CodeExamples,
            format!("{}/search", examples.uri()),
        ))
        .with_http_source(HttpSourceConfig::new(
            "framework",
            SourceKind::FrameworkDocs,
            format!("{}/search", framework.uri()),
        ));
    let orchestrator = RetrievalOrchestrator::builder(component_manager(&dir).await)
        .with_sources(config.build_sources())
        .with_config(config)
        .build();

    let results = orchestrator.retrieve("create a card component", 5).await;
    let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Custom views", "Reusable card view"]);
    assert_eq!(
        results[1].url.as_deref(),
        Some("https://examples.example.com/card")
    );
}
