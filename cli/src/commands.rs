//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use devdocs_corpus::{CorpusWatcher, DirectoryCorpus};
use devdocs_index::{BuildStatus, IndexBuilder, IndexManager, IndexStore};
use devdocs_retrieval::{RetrievalConfig, RetrievalOrchestrator};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::output;

/// Quiet period after a change before refreshing, so bursts of writes
/// trigger one rebuild.
const WATCH_SETTLE: Duration = Duration::from_millis(300);

fn open_manager(config: &RetrievalConfig) -> Arc<IndexManager> {
    Arc::new(IndexManager::new(
        IndexStore::new(&config.index_path),
        IndexBuilder::new(),
    ))
}

/// Print rebuild progress to stderr until aborted.
fn spawn_progress(manager: &IndexManager) -> JoinHandle<()> {
    let mut status = manager.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            if let BuildStatus::Indexing { progress, stage } = &*status.borrow_and_update() {
                eprintln!("[{:>3.0}%] {stage}", progress * 100.0);
            }
        }
    })
}

/// Refresh the index from the configured corpus, showing progress.
async fn refresh(
    manager: &IndexManager,
    corpus: &DirectoryCorpus,
) -> Result<Arc<devdocs_index::PersistentIndex>> {
    let progress = spawn_progress(manager);
    let result = manager.refresh(corpus).await;
    progress.abort();
    Ok(result?)
}

pub async fn index(config: RetrievalConfig, force: bool) -> Result<()> {
    let corpus = DirectoryCorpus::new(&config.corpus_dir);
    let manager = open_manager(&config);

    let index = if force {
        let documents = corpus.load().await?;
        if documents.is_empty() {
            bail!("corpus at {} is empty", corpus.root().display());
        }
        let progress = spawn_progress(&manager);
        let result = manager.rebuild(&documents).await;
        progress.abort();
        result?
    } else {
        refresh(&manager, &corpus).await?
    };

    println!(
        "{}",
        output::format_stats(&index, manager.rebuild_count() > 0)
    );
    Ok(())
}

pub async fn search(config: RetrievalConfig, query: &str, limit: usize, json: bool) -> Result<()> {
    let corpus = DirectoryCorpus::new(&config.corpus_dir);
    let manager = open_manager(&config);
    refresh(&manager, &corpus).await?;

    let orchestrator = RetrievalOrchestrator::builder(manager)
        .with_config(config)
        .build();
    let results = orchestrator.search(query, limit);

    let rendered = if json {
        output::to_json(query, &results)?
    } else {
        output::format_documents(query, &results)
    };
    println!("{rendered}");
    Ok(())
}

pub async fn retrieve(
    config: RetrievalConfig,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let corpus = DirectoryCorpus::new(&config.corpus_dir);
    let manager = open_manager(&config);
    refresh(&manager, &corpus).await?;

    let orchestrator = RetrievalOrchestrator::builder(manager)
        .with_sources(config.build_sources())
        .with_config(config)
        .build();

    // Ctrl-C abandons outstanding source calls but still prints what we have.
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let results = orchestrator
        .retrieve_with_cancel(query, limit, &cancel)
        .await;
    interrupt.abort();

    let rendered = if json {
        output::to_json(query, &results)?
    } else {
        output::format_knowledge(query, &results)
    };
    println!("{rendered}");
    Ok(())
}

pub async fn status(config: RetrievalConfig) -> Result<()> {
    let store = IndexStore::new(&config.index_path);
    let Some(index) = store.load().await else {
        println!("No usable index at {}", store.path().display());
        return Ok(());
    };

    let matches_corpus = match DirectoryCorpus::new(&config.corpus_dir).load().await {
        Ok(documents) => Some(IndexStore::is_valid(&index, &documents)),
        Err(e) => {
            warn!("Cannot compare against corpus: {e}");
            None
        }
    };

    println!(
        "{}",
        output::format_status(store.path(), &index, matches_corpus)
    );
    Ok(())
}

pub async fn watch(config: RetrievalConfig) -> Result<()> {
    let corpus = DirectoryCorpus::new(&config.corpus_dir);
    let manager = open_manager(&config);
    let index = refresh(&manager, &corpus).await?;
    println!("{}", output::format_stats(&index, manager.rebuild_count() > 0));

    let mut watcher = CorpusWatcher::start(corpus.root())?;
    info!("Press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watcher");
                break;
            }
            event = watcher.recv() => {
                let Some(event) = event else {
                    break;
                };
                debug!("{:?} {}", event.kind, event.path.display());

                tokio::time::sleep(WATCH_SETTLE).await;
                let coalesced = watcher.drain().len();
                if coalesced > 0 {
                    debug!("Coalesced {coalesced} further changes");
                }

                let rebuilds_before = manager.rebuild_count();
                match refresh(&manager, &corpus).await {
                    Ok(index) => {
                        let rebuilt = manager.rebuild_count() > rebuilds_before;
                        println!("{}", output::format_stats(&index, rebuilt));
                    }
                    Err(e) => warn!("Refresh failed: {e}"),
                }
            }
        }
    }

    Ok(())
}
