//! Human and JSON rendering of command results.

use std::fmt::Write as _;
use std::path::Path;

use devdocs_index::{IndexedDocument, PersistentIndex};
use devdocs_sources::RetrievedKnowledge;
use serde::Serialize;

#[derive(Serialize)]
struct JsonOutput<'a, T> {
    query: &'a str,
    count: usize,
    results: &'a [T],
}

/// Render results as pretty JSON.
pub fn to_json<T: Serialize>(query: &str, results: &[T]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonOutput {
        query,
        count: results.len(),
        results,
    })
}

pub fn format_documents(query: &str, results: &[IndexedDocument]) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\"");
    }

    let mut out = format!("{} results for \"{query}\"\n", results.len());
    for (rank, doc) in results.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {} [{}]", rank + 1, doc.title, doc.category);
        if !doc.summary.is_empty() {
            let _ = writeln!(out, "   {}", doc.summary);
        }
        if !doc.url.is_empty() {
            let _ = writeln!(out, "   {}", doc.url);
        }
    }
    out.trim_end().to_string()
}

pub fn format_knowledge(query: &str, results: &[RetrievedKnowledge]) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\"");
    }

    let mut out = format!("{} results for \"{query}\"\n", results.len());
    for (rank, item) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n{}. {} ({}, {:.2})",
            rank + 1,
            item.title,
            item.source_label,
            item.relevance_score
        );
        if !item.content.is_empty() {
            let _ = writeln!(out, "   {}", item.content);
        }
        if let Some(url) = &item.url {
            let _ = writeln!(out, "   {url}");
        }
    }
    out.trim_end().to_string()
}

/// One-line summary of an installed index.
pub fn format_stats(index: &PersistentIndex, rebuilt: bool) -> String {
    let stats = index.stats();
    format!(
        "{} index: {} topics, {} terms, {} concepts, {} categories",
        if rebuilt { "Rebuilt" } else { "Cached" },
        stats.document_count,
        stats.term_count,
        stats.concept_count,
        stats.category_count
    )
}

pub fn format_status(path: &Path, index: &PersistentIndex, matches_corpus: Option<bool>) -> String {
    let stats = index.stats();
    let freshness = match matches_corpus {
        Some(true) => "current",
        Some(false) => "stale (corpus changed)",
        None => "unknown (corpus unavailable)",
    };
    format!(
        "Index:      {}\nVersion:    {}\nCreated:    {}\nTopics:     {}\nTerms:      {}\nConcepts:   {}\nCategories: {}\nCorpus:     {freshness}",
        path.display(),
        index.version,
        index.created_at.to_rfc3339(),
        stats.document_count,
        stats.term_count,
        stats.concept_count,
        stats.category_count,
    )
}
