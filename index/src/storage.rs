//! Index persistence.
//!
//! The `IndexStore` reads and writes a single JSON index file. Anything that
//! prevents a stored index from being used (missing file, unreadable JSON,
//! another schema version, broken invariants) is a cache miss, reported as
//! `None`, never as an error.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{Result, StorageError};
use crate::fingerprint::corpus_hash;
use crate::index::{INDEX_SCHEMA_VERSION, PersistentIndex};

/// File-backed storage for a [`PersistentIndex`].
///
/// Loads and saves through the same store are serialized, and saves go
/// through a unique temporary file and a rename, so a load never observes a
/// partially written index.
#[derive(Debug)]
pub struct IndexStore {
    /// Path of the index file.
    path: PathBuf,

    /// Serializes file access.
    io_lock: Mutex<()>,
}

impl IndexStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `index` is usable for `corpus`: same schema version and same
    /// corpus fingerprint.
    pub fn is_valid(index: &PersistentIndex, corpus: &[Document]) -> bool {
        Self::is_valid_for_hash(index, &corpus_hash(corpus))
    }

    /// Like [`IndexStore::is_valid`], with a precomputed corpus fingerprint.
    pub fn is_valid_for_hash(index: &PersistentIndex, source_hash: &str) -> bool {
        index.is_current_schema() && index.source_hash == source_hash
    }

    /// Load the stored index, or `None` on any cache-miss condition.
    pub async fn load(&self) -> Option<PersistentIndex> {
        let _guard = self.io_lock.lock().await;

        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored index at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read index {}: {e}", self.path.display());
                return None;
            }
        };

        let index: PersistentIndex = match serde_json::from_slice(&content) {
            Ok(index) => index,
            Err(e) => {
                warn!("Discarding unreadable index {}: {e}", self.path.display());
                return None;
            }
        };

        if !index.is_current_schema() {
            info!(
                "Stored index version mismatch: found {}, expected {INDEX_SCHEMA_VERSION}",
                index.version
            );
            return None;
        }

        if let Err(reason) = index.check_integrity() {
            warn!("Discarding inconsistent index {}: {reason}", self.path.display());
            return None;
        }

        info!(
            "Loaded index ({} documents) from {}",
            index.document_count,
            self.path.display()
        );
        Some(index)
    }

    /// Persist an index, replacing any stored one atomically.
    ///
    /// The index is written to a uniquely named sibling file which is then
    /// renamed over the index path, so concurrent writers (in this process
    /// or another) never publish each other's partial writes.
    pub async fn save(&self, index: &PersistentIndex) -> Result<()> {
        let content = serde_json::to_vec(index)?;

        let _guard = self.io_lock.lock().await;

        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).await.map_err(|e| {
                    StorageError::CreateDirectory(format!("{}: {e}", parent.display()))
                })?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replacing(&parent, &path, &content))
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", self.path.display())))?
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", self.path.display())))?;

        info!(
            "Saved index ({} documents) to {}",
            index.document_count,
            self.path.display()
        );
        Ok(())
    }

    /// Delete the stored index, if any.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.io_lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Deleted stored index at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFile(format!("{}: {e}", self.path.display())).into()),
        }
    }
}

fn write_replacing(dir: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
