//! Cache validity and rebuild behaviour across manager instances.

use devdocs_index::{
    BuildStatus, Document, IndexBuilder, IndexManager, IndexStore, QueryEngine, corpus_hash,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::broadcast;

fn corpus() -> Vec<Document> {
    vec![
        Document::new("doc-a", "Buttons Accessibility", "Patterns")
            .with_summary("Buttons must have **minimum touch target** of 44pt"),
        Document::new("doc-b", "Color usage", "Foundations").with_summary("Use semantic colors"),
    ]
}

fn manager(dir: &TempDir) -> IndexManager {
    IndexManager::new(
        IndexStore::new(dir.path().join("index.json")),
        IndexBuilder::new(),
    )
}

fn drain(events: &mut broadcast::Receiver<BuildStatus>) -> Vec<BuildStatus> {
    let mut seen = Vec::new();
    while let Ok(status) = events.try_recv() {
        seen.push(status);
    }
    seen
}

#[tokio::test]
async fn unchanged_corpus_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let first = manager(&dir);
    let built = first.refresh(&corpus()).await.unwrap();

    // A fresh process: nothing installed, the stored file is still valid.
    let second = manager(&dir);
    assert_eq!(second.status(), BuildStatus::NotStarted);
    let stored = second.store().load().await.unwrap();
    assert!(IndexStore::is_valid(&stored, &corpus()));

    let mut events = second.status_events();
    let loaded = second.refresh(&corpus()).await.unwrap();

    assert_eq!(
        drain(&mut events),
        vec![BuildStatus::Checking, BuildStatus::Complete]
    );
    assert_eq!(second.rebuild_count(), 0);
    assert_eq!(loaded.source_hash, built.source_hash);
}

#[tokio::test]
async fn building_twice_yields_identical_hash() {
    let builder = IndexBuilder::new();
    let a = builder.build_now(&corpus());
    let b = builder.build_now(&corpus());
    assert_eq!(a.source_hash, b.source_hash);
    assert_eq!(a.term_index, b.term_index);
}

#[tokio::test]
async fn edited_abstract_triggers_rebuild() {
    let dir = TempDir::new().unwrap();
    let first = manager(&dir);
    let old = first.refresh(&corpus()).await.unwrap();

    let mut edited = corpus();
    edited[0].summary = "Buttons need a **hit region** of 44pt".to_string();
    assert_ne!(corpus_hash(&edited), old.source_hash);
    assert!(!IndexStore::is_valid(&old, &edited));

    let second = manager(&dir);
    let mut events = second.status_events();
    let rebuilt = second.refresh(&edited).await.unwrap();

    let seen = drain(&mut events);
    assert_eq!(seen.first(), Some(&BuildStatus::Checking));
    assert_eq!(seen.last(), Some(&BuildStatus::Complete));
    assert!(
        seen.iter()
            .any(|s| matches!(s, BuildStatus::Indexing { .. }))
    );
    assert_eq!(second.rebuild_count(), 1);
    assert_eq!(rebuilt.source_hash, corpus_hash(&edited));

    let stored = second.store().load().await.unwrap();
    assert!(IndexStore::is_valid(&stored, &edited));

    let hits = QueryEngine::new().search(&rebuilt, "hit region", 5);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "doc-a");
}

#[tokio::test]
async fn indexing_progress_is_monotonic() {
    let dir = TempDir::new().unwrap();
    let manager = IndexManager::new(
        IndexStore::new(dir.path().join("index.json")),
        IndexBuilder::new().with_yield_every(1),
    );
    let mut events = manager.status_events();
    manager.rebuild(&corpus()).await.unwrap();

    let fractions: Vec<f32> = drain(&mut events)
        .into_iter()
        .filter_map(|s| match s {
            BuildStatus::Indexing { progress, .. } => Some(progress),
            _ => None,
        })
        .collect();
    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
}

#[tokio::test]
async fn search_is_deterministic_and_bounded() {
    let index = IndexBuilder::new().build_now(&corpus());
    let engine = QueryEngine::new();
    for query in ["buttons", "use colors target", "touch", "zzz-nonexistent-token", ""] {
        let once: Vec<String> = engine
            .search(&index, query, 10)
            .iter()
            .map(|d| d.id.clone())
            .collect();
        let again: Vec<String> = engine
            .search(&index, query, 10)
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(once, again);
        for limit in 0..3 {
            assert!(engine.search(&index, query, limit).len() <= limit);
        }
    }
}
