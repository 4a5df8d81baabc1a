//! Documentation topic types.
//!
//! A [`Document`] is what the corpus loader produces and is never mutated by
//! the index. An [`IndexedDocument`] is the summary record the index keeps
//! for each topic: the display fields plus everything derived at build time.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A documentation topic as produced by the corpus loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique topic identifier.
    pub id: String,

    /// Topic title.
    pub title: String,

    /// Top-level category (e.g. "Foundations", "Patterns").
    pub category: String,

    /// Optional subcategory within the category.
    #[serde(default)]
    pub subcategory: Option<String>,

    /// Short abstract shown under the title.
    #[serde(rename = "abstract", default)]
    pub summary: String,

    /// Canonical URL of the topic.
    #[serde(default)]
    pub url: String,

    /// Ordered body sections.
    #[serde(default)]
    pub sections: Vec<Section>,

    /// Links to related topics.
    #[serde(default)]
    pub related_links: Vec<RelatedLink>,

    /// Platform tags declared by the source.
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl Document {
    /// Create a document with the required fields and an empty body.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            subcategory: None,
            summary: String::new(),
            url: String::new(),
            sections: Vec::new(),
            related_links: Vec::new(),
            platforms: Vec::new(),
        }
    }

    /// Set the abstract.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the subcategory.
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    /// Set the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Append a section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Append a related link.
    pub fn with_related(mut self, url: impl Into<String>) -> Self {
        self.related_links.push(RelatedLink {
            url: url.into(),
            title: None,
        });
        self
    }
}

/// A headed section of a topic body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section heading.
    pub heading: String,

    /// Heading level (1 = top level).
    #[serde(default = "default_level")]
    pub level: u8,

    /// Ordered content blocks.
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

fn default_level() -> u8 {
    2
}

impl Section {
    /// Create an empty section with the given heading.
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            level: default_level(),
            blocks: Vec::new(),
        }
    }

    /// Append a content block.
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.blocks.push(block);
        self
    }
}

/// A single block of section content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    /// Running prose.
    Paragraph { text: String },

    /// A bulleted or numbered list.
    List { items: Vec<String> },

    /// A code listing.
    Code {
        #[serde(default)]
        language: Option<String>,
        code: String,
    },

    /// A callout such as a note or warning.
    Aside {
        #[serde(default)]
        style: Option<String>,
        text: String,
    },

    /// An image; only its alt text is searchable.
    Image {
        #[serde(default)]
        alt: Option<String>,
    },

    /// A block type this crate does not understand; contributes no text.
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    /// Create a paragraph block.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph { text: text.into() }
    }

    /// The searchable text of this block.
    pub fn text(&self) -> String {
        match self {
            Self::Paragraph { text } | Self::Aside { text, .. } => text.clone(),
            Self::List { items } => items.join("\n"),
            Self::Code { code, .. } => code.clone(),
            Self::Image { alt } => alt.clone().unwrap_or_default(),
            Self::Unsupported => String::new(),
        }
    }
}

/// A link from one topic to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedLink {
    /// Target URL; its last path segment is the target topic id.
    pub url: String,

    /// Optional link title.
    #[serde(default)]
    pub title: Option<String>,
}

/// The per-document summary record stored in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub url: String,

    /// Search terms from title, abstract, category and section headings.
    pub keywords: IndexSet<String>,

    /// Emphasized spans, case-folded.
    pub concepts: IndexSet<String>,

    /// Ids of related topics, resolved from related link URLs.
    pub related_ids: Vec<String>,

    /// Fingerprint of the abstract, for downstream change detection.
    pub content_hash: String,

    /// Detected platforms, or the default pair when none were detected.
    pub platforms: Vec<String>,
}
