//! Document model and path derivation.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::frontmatter::Metadata;

/// A parsed source document.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Identifier assigned in discovery order, unique within one build.
    pub id: u32,

    /// Site-relative output path, always `/`-prefixed and `.html`-suffixed.
    pub path: String,

    /// Source path relative to the content root.
    pub source: PathBuf,

    /// Decoded metadata block (empty when the source has none).
    pub metadata: Metadata,

    /// Original body with the metadata block stripped.
    pub body_markup: String,

    /// Rendered body.
    pub body_html: String,

    /// Table of contents extracted from headings.
    #[serde(default)]
    pub toc: Vec<TocEntry>,
}

impl Document {
    /// File stem of the source (`getting-started` for `guides/getting-started.md`).
    pub fn stem(&self) -> Option<&str> {
        self.source.file_stem().and_then(|s| s.to_str())
    }
}

/// Table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,

    /// Heading text.
    pub text: String,

    /// Anchor ID for linking.
    pub id: String,
}

/// Monotonic identifier source for one discovery pass.
///
/// It cannot be rewound; each pass creates its own counter.
#[derive(Debug, Default)]
pub struct DocumentIds {
    next: u32,
}

impl DocumentIds {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next identifier.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of identifiers handed out so far.
    #[cfg(test)]
    pub(crate) fn issued(&self) -> u32 {
        self.next
    }
}

/// Derive the site path of a document from its source path relative to the
/// content root.
///
/// The extension is always rewritten to `.html` and separators are
/// normalized to `/`, so `guides\setup.md` and `guides/setup.md` both map to
/// `/guides/setup.html`.
pub fn derive_page_path(source: &Path) -> String {
    let rewritten = source.with_extension("html");
    let segments: Vec<String> = rewritten
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .flat_map(|part| {
            part.split('\\')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    format!("/{}", segments.join("/"))
}
