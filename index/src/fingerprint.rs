//! SHA-256 fingerprints for corpus invalidation and change detection.

use sha2::{Digest, Sha256};

use crate::document::{ContentBlock, Document};

/// Fingerprint an entire corpus.
///
/// Every field of every document feeds the digest, in corpus order, with
/// length prefixes so adjacent fields cannot run together. Two corpora hash
/// equal only if they contain the same documents in the same order.
pub fn corpus_hash(corpus: &[Document]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((corpus.len() as u64).to_le_bytes());
    for doc in corpus {
        hash_document(&mut hasher, doc);
    }
    format!("{:x}", hasher.finalize())
}

/// Fingerprint a single piece of text (used for topic abstracts).
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn hash_document(hasher: &mut Sha256, doc: &Document) {
    field(hasher, &doc.id);
    field(hasher, &doc.title);
    field(hasher, &doc.category);
    field(hasher, doc.subcategory.as_deref().unwrap_or_default());
    field(hasher, &doc.summary);
    field(hasher, &doc.url);

    hasher.update((doc.sections.len() as u64).to_le_bytes());
    for section in &doc.sections {
        field(hasher, &section.heading);
        hasher.update([section.level]);
        hasher.update((section.blocks.len() as u64).to_le_bytes());
        for block in &section.blocks {
            let tag: u8 = match block {
                ContentBlock::Paragraph { .. } => 0,
                ContentBlock::List { .. } => 1,
                ContentBlock::Code { .. } => 2,
                ContentBlock::Aside { .. } => 3,
                ContentBlock::Image { .. } => 4,
                ContentBlock::Unsupported => 5,
            };
            hasher.update([tag]);
            field(hasher, &block.text());
        }
    }

    hasher.update((doc.related_links.len() as u64).to_le_bytes());
    for link in &doc.related_links {
        field(hasher, &link.url);
    }

    hasher.update((doc.platforms.len() as u64).to_le_bytes());
    for platform in &doc.platforms {
        field(hasher, platform);
    }
}

fn field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
