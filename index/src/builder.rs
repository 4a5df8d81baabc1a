//! Index construction.
//!
//! The `IndexBuilder` turns a corpus into a [`PersistentIndex`]: one summary
//! record per document plus the term, concept and category inverted maps.

use std::sync::Arc;

use indexmap::IndexSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::document::{Document, IndexedDocument};
use crate::error::{IndexError, Result};
use crate::extraction::{ConceptExtractor, EmphasisExtractor};
use crate::fingerprint::{content_hash, corpus_hash};
use crate::index::{PersistentIndex, PostingMap};
use crate::tokenize::tokenize;

/// Platform names recognised in topic text, as (needle, display name).
const PLATFORM_VOCABULARY: [(&str, &str); 6] = [
    ("ios", "iOS"),
    ("ipados", "iPadOS"),
    ("macos", "macOS"),
    ("watchos", "watchOS"),
    ("tvos", "tvOS"),
    ("visionos", "visionOS"),
];

/// Platforms assumed when none are mentioned.
const DEFAULT_PLATFORMS: [&str; 2] = ["iOS", "macOS"];

/// Share of the progress bar spent on per-document indexing.
const INDEXING_SHARE: f32 = 0.95;

/// Receives build progress.
///
/// `fraction` never decreases over a single build and reaches `1.0` only
/// when the index is complete.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f32, stage: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(f32, &str) + Send + Sync,
{
    fn report(&self, fraction: f32, stage: &str) {
        self(fraction, stage);
    }
}

/// A progress sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _fraction: f32, _stage: &str) {}
}

/// Builds inverted indexes from a corpus.
#[derive(Clone)]
pub struct IndexBuilder {
    extractor: Arc<dyn ConceptExtractor>,
    yield_every: usize,
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("yield_every", &self.yield_every)
            .finish_non_exhaustive()
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    /// Create a builder using `**emphasis**` concept extraction.
    pub fn new() -> Self {
        Self {
            extractor: Arc::new(EmphasisExtractor::new()),
            yield_every: 64,
        }
    }

    /// Use a different concept extraction strategy.
    pub fn with_extractor(mut self, extractor: impl ConceptExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Yield to the runtime (and report progress) every `n` documents.
    pub fn with_yield_every(mut self, n: usize) -> Self {
        self.yield_every = n.max(1);
        self
    }

    /// Build an index synchronously, without progress or cancellation.
    pub fn build_now(&self, corpus: &[Document]) -> PersistentIndex {
        let mut postings = Postings::default();
        for doc in corpus {
            postings.add(self.index_document(doc));
        }
        postings.finish(corpus_hash(corpus))
    }

    /// Build an index, reporting progress and yielding to the runtime
    /// periodically so a host stays responsive.
    ///
    /// Returns [`IndexError::Cancelled`] as soon as `cancel` fires.
    pub async fn build(
        &self,
        corpus: &[Document],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PersistentIndex> {
        let total = corpus.len();
        info!("Building index over {total} documents");

        progress.report(0.0, "Fingerprinting corpus");
        let source_hash = corpus_hash(corpus);

        let mut postings = Postings::default();
        for (done, doc) in corpus.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!("Index build cancelled after {done} documents");
                return Err(IndexError::Cancelled);
            }

            postings.add(self.index_document(doc));

            let done = done + 1;
            if done % self.yield_every == 0 || done == total {
                let fraction = INDEXING_SHARE * done as f32 / total as f32;
                progress.report(fraction, &format!("Indexing topics ({done}/{total})"));
                tokio::task::yield_now().await;
            }
        }

        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        progress.report(INDEXING_SHARE, "Finalizing index");
        let index = postings.finish(source_hash);
        progress.report(1.0, "Index complete");

        let stats = index.stats();
        info!(
            "Built index: {} documents, {} terms, {} concepts, {} categories",
            stats.document_count, stats.term_count, stats.concept_count, stats.category_count
        );
        Ok(index)
    }

    /// Derive the summary record for one document.
    pub fn index_document(&self, doc: &Document) -> IndexedDocument {
        let mut keywords: IndexSet<String> = IndexSet::new();
        keywords.extend(tokenize(&doc.title));
        keywords.extend(tokenize(&doc.summary));
        let category = match &doc.subcategory {
            Some(sub) => format!("{} {sub}", doc.category),
            None => doc.category.clone(),
        };
        keywords.extend(tokenize(&category));
        for section in &doc.sections {
            keywords.extend(tokenize(&section.heading));
        }

        let mut concepts: IndexSet<String> = IndexSet::new();
        concepts.extend(
            self.extractor
                .extract_concepts(&doc.summary)
                .into_iter()
                .map(|c| c.to_lowercase()),
        );
        for block in doc.sections.iter().flat_map(|s| &s.blocks) {
            concepts.extend(
                self.extractor
                    .extract_concepts(&block.text())
                    .into_iter()
                    .map(|c| c.to_lowercase()),
            );
        }

        IndexedDocument {
            id: doc.id.clone(),
            title: doc.title.clone(),
            category: doc.category.clone(),
            subcategory: doc.subcategory.clone(),
            summary: doc.summary.clone(),
            url: doc.url.clone(),
            keywords,
            concepts,
            related_ids: doc
                .related_links
                .iter()
                .filter_map(|link| last_path_segment(&link.url))
                .collect(),
            content_hash: content_hash(&doc.summary),
            platforms: detect_platforms(doc),
        }
    }
}

/// Accumulates inverted maps while documents are indexed.
#[derive(Default)]
struct Postings {
    documents: Vec<IndexedDocument>,
    terms: PostingMap,
    concepts: PostingMap,
    categories: PostingMap,
}

impl Postings {
    fn add(&mut self, doc: IndexedDocument) {
        for keyword in &doc.keywords {
            self.terms
                .entry(keyword.clone())
                .or_default()
                .push(doc.id.clone());
        }
        for concept in &doc.concepts {
            self.concepts
                .entry(concept.clone())
                .or_default()
                .push(doc.id.clone());
        }
        self.categories
            .entry(doc.category.clone())
            .or_default()
            .push(doc.id.clone());
        self.documents.push(doc);
    }

    fn finish(self, source_hash: String) -> PersistentIndex {
        PersistentIndex::new(
            source_hash,
            self.documents,
            self.terms,
            self.concepts,
            self.categories,
        )
    }
}

fn detect_platforms(doc: &Document) -> Vec<String> {
    let mut haystack = doc.summary.to_lowercase();
    for section in &doc.sections {
        haystack.push(' ');
        haystack.push_str(&section.heading.to_lowercase());
    }

    let detected: Vec<String> = PLATFORM_VOCABULARY
        .iter()
        .filter(|(needle, _)| haystack.contains(needle))
        .map(|(_, name)| (*name).to_string())
        .collect();

    if detected.is_empty() {
        DEFAULT_PLATFORMS.iter().map(|p| (*p).to_string()).collect()
    } else {
        detected
    }
}

/// The last non-empty path segment of a URL, ignoring query and fragment.
fn last_path_segment(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::document::{ContentBlock, Section};
    use pretty_assertions::assert_eq;

    fn buttons() -> Document {
        Document::new("buttons", "Buttons Accessibility", "Patterns")
            .with_subcategory("Input")
            .with_summary("Buttons must have **minimum touch target** of 44pt")
            .with_section(
                Section::new("Platform considerations for watchOS")
                    .with_block(ContentBlock::paragraph("Prefer **Clear Labels**.")),
            )
            .with_related("https://developer.example.com/design/menus/")
            .with_related("doc://topics/color#overview")
    }

    #[test]
    fn test_keywords_cover_title_abstract_category_and_headings() {
        let doc = IndexBuilder::new().index_document(&buttons());
        for expected in ["buttons", "accessibility", "touch", "patterns", "input", "watchos"] {
            assert!(doc.keywords.contains(expected), "missing {expected}");
        }
        assert!(!doc.keywords.contains("of"));
    }

    #[test]
    fn test_concepts_are_case_folded() {
        let doc = IndexBuilder::new().index_document(&buttons());
        let concepts: Vec<&str> = doc.concepts.iter().map(String::as_str).collect();
        assert_eq!(concepts, vec!["minimum touch target", "clear labels"]);
    }

    #[test]
    fn test_platform_detection_and_default() {
        let doc = IndexBuilder::new().index_document(&buttons());
        assert_eq!(doc.platforms, vec!["watchOS"]);

        let plain = IndexBuilder::new().index_document(&Document::new("x", "Color", "Foundations"));
        assert_eq!(plain.platforms, vec!["iOS", "macOS"]);
    }

    #[test]
    fn test_related_ids_use_last_path_segment() {
        let doc = IndexBuilder::new().index_document(&buttons());
        assert_eq!(doc.related_ids, vec!["menus", "color"]);
    }

    #[test]
    fn test_postings_follow_build_order() {
        let index = IndexBuilder::new().build_now(&[
            Document::new("a", "Touch input", "Patterns"),
            Document::new("b", "Touch bar", "Patterns"),
        ]);
        assert_eq!(index.term_index["touch"], vec!["a", "b"]);
        assert_eq!(index.category_index["Patterns"], vec!["a", "b"]);
        assert_eq!(index.document_count, 2);
        assert!(index.check_integrity().is_ok());
    }

    #[tokio::test]
    async fn test_build_reports_monotonic_progress() {
        let corpus: Vec<Document> = (0..10)
            .map(|i| Document::new(format!("doc-{i}"), format!("Topic {i}"), "General"))
            .collect();
        let seen = Mutex::new(Vec::new());
        let sink = |fraction: f32, stage: &str| {
            seen.lock().unwrap().push((fraction, stage.to_string()));
        };

        let index = IndexBuilder::new()
            .with_yield_every(3)
            .build(&corpus, &sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(index.document_count, 10);
        let seen = seen.into_inner().unwrap();
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen.last().map(|s| s.0), Some(1.0));
        assert!(seen.iter().any(|(_, stage)| stage == "Indexing topics (10/10)"));
    }

    #[tokio::test]
    async fn test_build_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = IndexBuilder::new()
            .build(&[buttons()], &NoProgress, &cancel)
            .await;
        assert!(matches!(result, Err(IndexError::Cancelled)));
    }

    #[tokio::test]
    async fn test_async_and_sync_builds_agree() {
        let corpus = vec![buttons(), Document::new("color", "Color", "Foundations")];
        let builder = IndexBuilder::new();
        let a = builder.build_now(&corpus);
        let b = builder
            .build(&corpus, &NoProgress, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(a.source_hash, b.source_hash);
        assert_eq!(a.term_index, b.term_index);
        assert_eq!(a.documents, b.documents);
    }
}
