//! Loading a corpus from a directory of JSON topic files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use devdocs_index::{CorpusProvider, Document};
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CorpusError, Result};

/// Extension of topic files.
pub const TOPIC_EXTENSION: &str = "json";

/// One topic file holds a single document or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum TopicFile {
    Many(Vec<Document>),
    One(Box<Document>),
}

/// Result of scanning a corpus directory.
#[derive(Debug, Clone, Default)]
pub struct CorpusScan {
    /// Documents in load order.
    pub documents: Vec<Document>,

    /// Topic files read successfully.
    pub files_read: usize,

    /// Topic files skipped as unreadable or malformed.
    pub files_skipped: usize,

    /// Documents dropped because their id was already loaded.
    pub duplicates: usize,
}

/// A corpus stored as `*.json` topic files under one directory.
///
/// Files are read in sorted path order so the corpus (and therefore its
/// fingerprint) is stable across runs.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
    follow_symlinks: bool,
}

impl DirectoryCorpus {
    /// Create a loader for the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
        }
    }

    /// Follow symbolic links while walking.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// The corpus directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` looks like a topic file.
    pub fn is_topic_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(TOPIC_EXTENSION))
    }

    /// Walk the directory and parse every topic file.
    pub fn scan(&self) -> Result<CorpusScan> {
        if !self.root.exists() {
            return Err(CorpusError::NotFound(self.root.display().to_string()));
        }
        if !self.root.is_dir() {
            return Err(CorpusError::NotADirectory(self.root.display().to_string()));
        }

        let mut scan = CorpusScan::default();
        let mut seen_ids = HashSet::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The root itself is unreadable: there is no corpus.
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping unreadable corpus entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !Self::is_topic_file(path) {
                continue;
            }

            let documents = match read_topic_file(path) {
                Ok(documents) => documents,
                Err(e) => {
                    warn!("Skipping topic file {}: {e}", path.display());
                    scan.files_skipped += 1;
                    continue;
                }
            };
            scan.files_read += 1;

            for document in documents {
                if seen_ids.insert(document.id.clone()) {
                    scan.documents.push(document);
                } else {
                    debug!(
                        "Duplicate topic id {} in {}; keeping the first",
                        document.id,
                        path.display()
                    );
                    scan.duplicates += 1;
                }
            }
        }

        info!(
            "Loaded {} topics from {} files in {} (skipped: {}, duplicates: {})",
            scan.documents.len(),
            scan.files_read,
            self.root.display(),
            scan.files_skipped,
            scan.duplicates
        );
        Ok(scan)
    }

    /// Load the corpus without blocking the async runtime.
    pub async fn load(&self) -> Result<Vec<Document>> {
        let loader = self.clone();
        tokio::task::spawn_blocking(move || loader.scan())
            .await
            .map_err(|e| CorpusError::Task(e.to_string()))?
            .map(|scan| scan.documents)
    }
}

fn read_topic_file(path: &Path) -> Result<Vec<Document>> {
    let content = std::fs::read(path)?;
    match serde_json::from_slice::<TopicFile>(&content)? {
        TopicFile::Many(documents) => Ok(documents),
        TopicFile::One(document) => Ok(vec![*document]),
    }
}

#[async_trait]
impl CorpusProvider for DirectoryCorpus {
    async fn load_corpus(&self) -> devdocs_index::Result<Vec<Document>> {
        Ok(self.load().await?)
    }
}
