//! Configuration for retrieval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use devdocs_sources::{CachedSource, HttpSource, KnowledgeSource, SourceKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RetrievalError};

/// Name of the directory under the platform data dir holding devdocs state.
const APP_DIR: &str = "devdocs";

/// Configuration for the retrieval orchestrator and its index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Path of the persisted index file.
    pub index_path: PathBuf,

    /// Directory holding the corpus topic files.
    pub corpus_dir: PathBuf,

    /// Number of local index results fed into each retrieval.
    pub local_limit: usize,

    /// Deadline for a single external source call, in milliseconds.
    pub source_timeout_ms: u64,

    /// Which source categories may be consulted.
    pub sources: SourceToggles,

    /// How many results to request from each source category.
    pub budgets: SourceBudgets,

    /// Response caching for HTTP sources.
    pub cache: CacheConfig,

    /// External HTTP search endpoints.
    pub http_sources: Vec<HttpSourceConfig>,
}

impl RetrievalConfig {
    /// Create a configuration storing state under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            index_path: data_dir.join("index.json"),
            corpus_dir: data_dir.join("topics"),
            local_limit: 5,
            source_timeout_ms: 5_000,
            sources: SourceToggles::default(),
            budgets: SourceBudgets::default(),
            cache: CacheConfig::default(),
            http_sources: Vec::new(),
        }
    }

    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml(&content)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.source_timeout_ms == 0 {
            return Err(RetrievalError::Config(
                "source_timeout_ms must be greater than zero".to_string(),
            ));
        }
        for source in &self.http_sources {
            if source.name.trim().is_empty() {
                return Err(RetrievalError::Config(
                    "http source with an empty name".to_string(),
                ));
            }
            if source.endpoint.trim().is_empty() {
                return Err(RetrievalError::Config(format!(
                    "http source {} has no endpoint",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Per-source deadline.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Set the index path.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = path.into();
        self
    }

    /// Set the corpus directory.
    pub fn with_corpus_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.corpus_dir = dir.into();
        self
    }

    /// Set the per-source deadline.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the number of local results per retrieval.
    pub fn with_local_limit(mut self, limit: usize) -> Self {
        self.local_limit = limit;
        self
    }

    /// Enable or disable a source category.
    pub fn with_source_enabled(mut self, kind: SourceKind, enabled: bool) -> Self {
        self.sources.set(kind, enabled);
        self
    }

    /// Set the result budget of a source category.
    pub fn with_budget(mut self, kind: SourceKind, budget: usize) -> Self {
        self.budgets.set(kind, budget);
        self
    }

    /// Add an HTTP source.
    pub fn with_http_source(mut self, source: HttpSourceConfig) -> Self {
        self.http_sources.push(source);
        self
    }

    /// Instantiate the configured HTTP sources.
    pub fn build_sources(&self) -> Vec<Arc<dyn KnowledgeSource>> {
        self.http_sources
            .iter()
            .map(|source| source.build(&self.cache))
            .collect()
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new(dirs::data_dir().unwrap_or_default().join(APP_DIR))
    }
}

/// Enable/disable switch per source category. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceToggles {
    pub language_docs: bool,
    pub framework_docs: bool,
    pub code_examples: bool,
    pub package_index: bool,
    pub community: bool,
}

impl SourceToggles {
    /// Whether sources of `kind` may be consulted.
    pub fn is_enabled(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::LanguageDocs => self.language_docs,
            SourceKind::FrameworkDocs => self.framework_docs,
            SourceKind::CodeExamples => self.code_examples,
            SourceKind::PackageIndex => self.package_index,
            SourceKind::Community => self.community,
        }
    }

    /// Enable or disable sources of `kind`.
    pub fn set(&mut self, kind: SourceKind, enabled: bool) {
        let slot = match kind {
            SourceKind::LanguageDocs => &mut self.language_docs,
            SourceKind::FrameworkDocs => &mut self.framework_docs,
            SourceKind::CodeExamples => &mut self.code_examples,
            SourceKind::PackageIndex => &mut self.package_index,
            SourceKind::Community => &mut self.community,
        };
        *slot = enabled;
    }
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            language_docs: true,
            framework_docs: true,
            code_examples: true,
            package_index: true,
            community: true,
        }
    }
}

/// Number of results requested per source category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceBudgets {
    pub language_docs: usize,
    pub framework_docs: usize,
    pub code_examples: usize,
    pub package_index: usize,
    pub community: usize,
}

impl SourceBudgets {
    /// Budget for sources of `kind`.
    pub fn get(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::LanguageDocs => self.language_docs,
            SourceKind::FrameworkDocs => self.framework_docs,
            SourceKind::CodeExamples => self.code_examples,
            SourceKind::PackageIndex => self.package_index,
            SourceKind::Community => self.community,
        }
    }

    /// Set the budget for sources of `kind`.
    pub fn set(&mut self, kind: SourceKind, budget: usize) {
        let slot = match kind {
            SourceKind::LanguageDocs => &mut self.language_docs,
            SourceKind::FrameworkDocs => &mut self.framework_docs,
            SourceKind::CodeExamples => &mut self.code_examples,
            SourceKind::PackageIndex => &mut self.package_index,
            SourceKind::Community => &mut self.community,
        };
        *slot = budget;
    }
}

impl Default for SourceBudgets {
    fn default() -> Self {
        Self {
            language_docs: 3,
            framework_docs: 3,
            code_examples: 3,
            package_index: 2,
            community: 2,
        }
    }
}

/// Response cache settings for HTTP sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether to cache responses.
    pub enabled: bool,

    /// Maximum cached responses per source.
    pub max_entries: usize,

    /// Seconds before a cached response is refetched; none keeps entries
    /// until evicted.
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
            ttl_secs: Some(3600),
        }
    }
}

/// An external JSON search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// Source name, used as the result label.
    pub name: String,

    /// Source category.
    pub kind: SourceKind,

    /// Search endpoint URL.
    pub endpoint: String,

    /// Environment variable holding a bearer token, if the endpoint needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl HttpSourceConfig {
    /// Create an endpoint definition.
    pub fn new(name: impl Into<String>, kind: SourceKind, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoint: endpoint.into(),
            api_key_env: None,
        }
    }

    /// Instantiate the source, wrapped in a response cache if enabled.
    pub fn build(&self, cache: &CacheConfig) -> Arc<dyn KnowledgeSource> {
        let mut source = HttpSource::new(&self.name, self.kind, &self.endpoint);
        if let Some(var) = &self.api_key_env {
            match std::env::var(var) {
                Ok(key) => source = source.with_api_key(key),
                Err(_) => warn!("{}: environment variable {var} is not set", self.name),
            }
        }

        if !cache.enabled {
            return Arc::new(source);
        }
        let mut cached = CachedSource::new(source, cache.max_entries);
        if let Some(ttl) = cache.ttl_secs {
            cached = cached.with_ttl(Duration::from_secs(ttl));
        }
        Arc::new(cached)
    }
}
