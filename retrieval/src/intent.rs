//! Query intent classification.
//!
//! Intents are detected by keyword buckets checked in a fixed precedence
//! order; the first bucket with a matching keyword wins. Single-word
//! keywords match whole query words, multi-word keywords match as phrases.

use std::collections::HashSet;
use std::fmt;

use devdocs_sources::SourceKind;
use serde::{Deserialize, Serialize};

/// What a query is about, used to pick external sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    SwiftLanguage,
    AppleFramework,
    UiDesign,
    BuildProject,
    CreateComponent,
    Performance,
    Testing,
    Debugging,
    General,
}

impl Intent {
    /// External source categories consulted for this intent, in merge order.
    pub fn source_kinds(self) -> &'static [SourceKind] {
        use SourceKind::*;
        match self {
            Intent::SwiftLanguage => &[LanguageDocs, FrameworkDocs],
            Intent::AppleFramework => &[FrameworkDocs, CodeExamples],
            Intent::UiDesign => &[FrameworkDocs, CodeExamples],
            Intent::BuildProject => &[CodeExamples, PackageIndex, FrameworkDocs],
            Intent::CreateComponent => &[CodeExamples, FrameworkDocs],
            Intent::Performance => &[FrameworkDocs, Community],
            Intent::Testing => &[FrameworkDocs, CodeExamples],
            Intent::Debugging => &[Community, FrameworkDocs],
            Intent::General => &[FrameworkDocs, Community],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::SwiftLanguage => "swiftLanguage",
            Intent::AppleFramework => "appleFramework",
            Intent::UiDesign => "uiDesign",
            Intent::BuildProject => "buildProject",
            Intent::CreateComponent => "createComponent",
            Intent::Performance => "performance",
            Intent::Testing => "testing",
            Intent::Debugging => "debugging",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword buckets in precedence order.
const BUCKETS: &[(Intent, &[&str])] = &[
    (
        Intent::CreateComponent,
        &[
            "component",
            "components",
            "create",
            "custom view",
            "new view",
            "make a view",
            "reusable",
        ],
    ),
    (
        Intent::BuildProject,
        &[
            "build",
            "compile",
            "project",
            "xcode",
            "package",
            "dependency",
            "dependencies",
            "spm",
            "archive",
            "set up",
            "setup",
        ],
    ),
    (
        Intent::SwiftLanguage,
        &[
            "swift",
            "closure",
            "closures",
            "protocol",
            "protocols",
            "generic",
            "generics",
            "optional",
            "optionals",
            "async",
            "await",
            "actor",
            "actors",
            "struct",
            "enum",
            "syntax",
            "concurrency",
            "property wrapper",
        ],
    ),
    (
        Intent::UiDesign,
        &[
            "design",
            "layout",
            "color",
            "colors",
            "typography",
            "font",
            "accessibility",
            "button",
            "buttons",
            "navigation",
            "icon",
            "icons",
            "animation",
            "dark mode",
            "human interface",
        ],
    ),
    (
        Intent::AppleFramework,
        &[
            "swiftui",
            "uikit",
            "appkit",
            "foundation",
            "combine",
            "core data",
            "swiftdata",
            "mapkit",
            "cloudkit",
            "healthkit",
            "arkit",
            "framework",
            "api",
        ],
    ),
    (
        Intent::Performance,
        &[
            "performance",
            "slow",
            "memory",
            "leak",
            "optimize",
            "optimise",
            "speed",
            "instruments",
            "profile",
            "profiling",
            "lag",
        ],
    ),
    (
        Intent::Testing,
        &[
            "test",
            "tests",
            "testing",
            "xctest",
            "unit test",
            "ui test",
            "mock",
            "coverage",
        ],
    ),
    (
        Intent::Debugging,
        &[
            "debug",
            "debugging",
            "crash",
            "crashes",
            "error",
            "bug",
            "exception",
            "breakpoint",
            "fix",
            "failing",
        ],
    ),
];

/// Maps free-text queries to an [`Intent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a query. Never fails; unmatched queries are `General`.
    pub fn classify(&self, query: &str) -> Intent {
        let lowered = query.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let word_set: HashSet<&str> = words.iter().copied().collect();
        // Padded so phrase matches stop at word boundaries.
        let phrase_text = format!(" {} ", words.join(" "));

        BUCKETS
            .iter()
            .find(|(_, keywords)| {
                keywords.iter().any(|keyword| {
                    if keyword.contains(' ') {
                        phrase_text.contains(&format!(" {keyword} "))
                    } else {
                        word_set.contains(keyword)
                    }
                })
            })
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::General)
    }
}
