//! Index lifecycle: cache checks, rebuilds and build status.
//!
//! `IndexManager` is the one service object that owns the current index.
//! Construct it once and share it (`Arc<IndexManager>`) with everything that
//! needs to search or observe build progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::builder::IndexBuilder;
use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::fingerprint::corpus_hash;
use crate::index::PersistentIndex;
use crate::storage::IndexStore;

/// Capacity of the status transition channel.
const STATUS_EVENT_CAPACITY: usize = 256;

/// Observable state of the index build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BuildStatus {
    /// Nothing has been requested yet.
    NotStarted,

    /// Comparing the cached index against the corpus.
    Checking,

    /// Rebuilding; `progress` runs from 0.0 to 1.0.
    Indexing { progress: f32, stage: String },

    /// An index matching the corpus is installed.
    Complete,

    /// The corpus could not be indexed.
    Error { message: String },
}

/// Supplies the corpus to index.
#[async_trait]
pub trait CorpusProvider: Send + Sync {
    /// Load every document of the current corpus.
    async fn load_corpus(&self) -> Result<Vec<Document>>;
}

#[async_trait]
impl CorpusProvider for Vec<Document> {
    async fn load_corpus(&self) -> Result<Vec<Document>> {
        Ok(self.clone())
    }
}

/// Owns the current index and keeps it in step with the corpus.
pub struct IndexManager {
    /// Backing store for the persisted index.
    store: IndexStore,

    /// Builder used for rebuilds.
    builder: IndexBuilder,

    /// The installed index, readable without waiting on builds.
    index_tx: watch::Sender<Option<Arc<PersistentIndex>>>,

    /// Latest build status.
    status_tx: watch::Sender<BuildStatus>,

    /// Every status transition, for observers that need the full sequence.
    events_tx: broadcast::Sender<BuildStatus>,

    /// Generation of the newest requested rebuild.
    generation: AtomicU64,

    /// Generation and cancellation handle of the in-flight rebuild.
    in_flight: Mutex<Option<(u64, CancellationToken)>>,

    /// Serializes "check generation, save, install".
    install_lock: Mutex<()>,

    /// Number of rebuilds started.
    rebuilds: AtomicUsize,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("store", &self.store.path())
            .field("status", &*self.status_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl IndexManager {
    /// Create a manager persisting to `store`.
    pub fn new(store: IndexStore, builder: IndexBuilder) -> Self {
        let (index_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(BuildStatus::NotStarted);
        let (events_tx, _) = broadcast::channel(STATUS_EVENT_CAPACITY);
        Self {
            store,
            builder,
            index_tx,
            status_tx,
            events_tx,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            install_lock: Mutex::new(()),
            rebuilds: AtomicUsize::new(0),
        }
    }

    /// The persisted-index store.
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// The currently installed index, if any.
    pub fn current(&self) -> Option<Arc<PersistentIndex>> {
        self.index_tx.borrow().clone()
    }

    /// The latest build status.
    pub fn status(&self) -> BuildStatus {
        self.status_tx.borrow().clone()
    }

    /// Watch the latest build status.
    pub fn subscribe(&self) -> watch::Receiver<BuildStatus> {
        self.status_tx.subscribe()
    }

    /// Receive every status transition from now on.
    pub fn status_events(&self) -> broadcast::Receiver<BuildStatus> {
        self.events_tx.subscribe()
    }

    /// Number of full rebuilds started by this manager.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: BuildStatus) {
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status.clone();
                true
            }
        });
        if changed {
            // No receivers is fine.
            let _ = self.events_tx.send(status);
        }
    }

    /// Load the corpus from `provider` and make sure a matching index is
    /// installed, rebuilding only when the cached one is stale.
    pub async fn refresh(&self, provider: &dyn CorpusProvider) -> Result<Arc<PersistentIndex>> {
        self.set_status(BuildStatus::Checking);

        let corpus = match provider.load_corpus().await {
            Ok(corpus) if corpus.is_empty() => {
                return Err(self.fail_corpus("corpus is empty".to_string()));
            }
            Ok(corpus) => corpus,
            Err(e) => return Err(self.fail_corpus(e.to_string())),
        };

        self.ensure(&corpus).await
    }

    fn fail_corpus(&self, message: String) -> IndexError {
        error!("Corpus unavailable: {message}");
        self.set_status(BuildStatus::Error {
            message: message.clone(),
        });
        IndexError::CorpusUnavailable(message)
    }

    /// Make sure an index matching `corpus` is installed.
    ///
    /// Checks the installed index, then the stored one; rebuilds only if
    /// neither matches the corpus fingerprint. Like [`IndexManager::rebuild`],
    /// this is a new request: it supersedes any in-flight rebuild, so a
    /// stale build can never install over the index returned here.
    pub async fn ensure(&self, corpus: &[Document]) -> Result<Arc<PersistentIndex>> {
        self.set_status(BuildStatus::Checking);
        let source_hash = corpus_hash(corpus);
        let (generation, cancel) = self.begin_request().await;

        if self
            .current()
            .is_some_and(|i| IndexStore::is_valid_for_hash(&i, &source_hash))
        {
            let _guard = self.install_lock.lock().await;
            if !self.is_newest(generation) {
                return Err(IndexError::Superseded);
            }
            // Re-read under the lock; a finishing build may have installed.
            if let Some(index) = self
                .current()
                .filter(|i| IndexStore::is_valid_for_hash(i, &source_hash))
            {
                debug!("Installed index is current");
                self.set_status(BuildStatus::Complete);
                self.end_request(generation).await;
                return Ok(index);
            }
        }

        match self
            .store
            .load()
            .await
            .filter(|i| IndexStore::is_valid_for_hash(i, &source_hash))
        {
            Some(stored) => {
                let _guard = self.install_lock.lock().await;
                if !self.is_newest(generation) {
                    debug!("Discarding superseded cache check (generation {generation})");
                    return Err(IndexError::Superseded);
                }
                info!("Using cached index ({} documents)", stored.document_count);
                let index = Arc::new(stored);
                self.index_tx.send_replace(Some(Arc::clone(&index)));
                self.set_status(BuildStatus::Complete);
                self.end_request(generation).await;
                Ok(index)
            }
            None => {
                info!("Cached index missing or stale; rebuilding");
                self.build_generation(corpus, generation, cancel).await
            }
        }
    }

    /// Rebuild the index from `corpus`, superseding any in-flight rebuild.
    ///
    /// A superseded rebuild never saves or installs its result and returns
    /// [`IndexError::Superseded`].
    pub async fn rebuild(&self, corpus: &[Document]) -> Result<Arc<PersistentIndex>> {
        let (generation, cancel) = self.begin_request().await;
        self.build_generation(corpus, generation, cancel).await
    }

    /// Claim the next generation and cancel the request it supersedes.
    async fn begin_request(&self) -> (u64, CancellationToken) {
        let mut in_flight = self.in_flight.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        if let Some((_, previous)) = in_flight.replace((generation, cancel.clone())) {
            debug!("Superseding in-flight request");
            previous.cancel();
        }
        (generation, cancel)
    }

    async fn end_request(&self, generation: u64) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().is_some_and(|(owner, _)| *owner == generation) {
            *in_flight = None;
        }
    }

    fn is_newest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn build_generation(
        &self,
        corpus: &[Document],
        generation: u64,
        cancel: CancellationToken,
    ) -> Result<Arc<PersistentIndex>> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);

        let progress = |fraction: f32, stage: &str| {
            if self.is_newest(generation) {
                self.set_status(BuildStatus::Indexing {
                    progress: fraction,
                    stage: stage.to_string(),
                });
            }
        };

        let built = self.builder.build(corpus, &progress, &cancel).await;

        let _guard = self.install_lock.lock().await;
        if !self.is_newest(generation) {
            debug!("Discarding superseded rebuild (generation {generation})");
            return Err(IndexError::Superseded);
        }

        let result = match built {
            Ok(index) => {
                if let Err(e) = self.store.save(&index).await {
                    warn!("Failed to persist index, keeping it in memory only: {e}");
                }
                let index = Arc::new(index);
                self.index_tx.send_replace(Some(Arc::clone(&index)));
                self.set_status(BuildStatus::Complete);
                Ok(index)
            }
            Err(IndexError::Cancelled) => {
                info!("Index rebuild cancelled");
                self.set_status(if self.current().is_some() {
                    BuildStatus::Complete
                } else {
                    BuildStatus::NotStarted
                });
                Err(IndexError::Cancelled)
            }
            Err(e) => {
                error!("Index rebuild failed: {e}");
                self.set_status(BuildStatus::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        };

        self.end_request(generation).await;
        result
    }

    /// Cancel the in-flight rebuild, if any.
    pub async fn cancel_build(&self) {
        if let Some((_, token)) = self.in_flight.lock().await.take() {
            token.cancel();
        }
    }
}
