//! Watching a corpus directory for topic file changes.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{CorpusError, Result};
use crate::loader::DirectoryCorpus;

/// Capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Kind of corpus change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusEventKind {
    Created,
    Modified,
    Removed,
}

impl CorpusEventKind {
    /// Map a notify event kind; access and unknown events are not changes.
    fn from_notify(kind: notify::EventKind) -> Option<Self> {
        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Modify(notify::event::ModifyKind::Name(
                notify::event::RenameMode::From,
            )) => Some(Self::Removed),
            notify::EventKind::Modify(notify::event::ModifyKind::Name(_)) => Some(Self::Created),
            notify::EventKind::Modify(_) => Some(Self::Modified),
            notify::EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }
}

/// A change to a topic file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEvent {
    pub kind: CorpusEventKind,
    pub path: PathBuf,
}

/// Reports changes to topic files under a corpus directory.
///
/// Dropping the watcher stops watching.
pub struct CorpusWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
    event_rx: mpsc::Receiver<CorpusEvent>,
}

impl CorpusWatcher {
    /// Start watching `root` recursively.
    pub fn start(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(CorpusError::NotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(CorpusError::NotADirectory(root.display().to_string()));
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let Some(kind) = CorpusEventKind::from_notify(event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if !DirectoryCorpus::is_topic_file(&path) {
                            continue;
                        }
                        debug!("Corpus change {kind:?}: {}", path.display());
                        if let Err(e) = event_tx.blocking_send(CorpusEvent { kind, path }) {
                            error!("Failed to send corpus event: {e}");
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {e}");
                }
            },
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Watching corpus directory: {}", root.display());

        Ok(Self {
            root,
            _watcher: watcher,
            event_rx,
        })
    }

    /// The watched directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wait for the next change. Returns `None` once the watcher has shut down.
    pub async fn recv(&mut self) -> Option<CorpusEvent> {
        self.event_rx.recv().await
    }

    /// Take every change queued so far without waiting.
    pub fn drain(&mut self) -> Vec<CorpusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }
}
