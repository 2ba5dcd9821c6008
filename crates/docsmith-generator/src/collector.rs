//! Content discovery.
//!
//! Walks the content directory once, in file name order, and turns every
//! Markdown file into a [`Document`] with its metadata split off. Custom HTML
//! pages and images are recorded for later passes. Discovery is sequential
//! and stops at the first malformed metadata block.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use docsmith_core::{Document, DocumentIds, derive_page_path};
use docsmith_parser::{MarkdownParser, ParserError};
use thiserror::Error;
use tracing::{debug, info};

use crate::walk::{has_extension, walk_files};

pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico"];

/// Content collection errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed metadata block.
    #[error(transparent)]
    Parse(#[from] ParserError),

    /// Two sources map to the same output page.
    #[error("{first} and {second} both produce {path}")]
    DuplicatePath {
        path: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Collected site content.
#[derive(Debug, Default)]
pub struct SiteContent {
    /// Documents in discovery order; `documents[i].id == i`.
    pub documents: Vec<Document>,

    /// Custom HTML pages, relative to the content root.
    pub custom_pages: Vec<PathBuf>,

    /// Images, relative to the content root.
    pub images: Vec<PathBuf>,
}

/// Content collector that walks directories and splits documents.
#[derive(Debug)]
pub struct ContentCollector<'a> {
    parser: &'a MarkdownParser,
    content_dir: PathBuf,
}

impl<'a> ContentCollector<'a> {
    /// Create a new content collector.
    #[must_use]
    pub fn new(parser: &'a MarkdownParser, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            parser,
            content_dir: content_dir.into(),
        }
    }

    /// Collect all content from the content directory.
    ///
    /// Bodies are not rendered yet: `body_html` stays empty until the page
    /// render pass.
    pub fn collect(&self) -> Result<SiteContent> {
        info!(dir = %self.content_dir.display(), "collecting content");

        let mut content = SiteContent::default();
        let mut ids = DocumentIds::new();
        let mut outputs: BTreeMap<String, PathBuf> = BTreeMap::new();

        walk_files(
            &self.content_dir,
            |_| true,
            |path, relative| {
                if has_extension(path, MARKDOWN_EXTENSIONS) {
                    let doc = self.read_document(path, relative, &mut ids)?;
                    claim_output(&mut outputs, &doc.path, relative)?;
                    debug!(id = doc.id, path = %doc.path, "discovered document");
                    content.documents.push(doc);
                } else if has_extension(path, &["html", "htm"]) {
                    claim_output(&mut outputs, &custom_page_path(relative), relative)?;
                    content.custom_pages.push(relative.to_path_buf());
                } else if has_extension(path, IMAGE_EXTENSIONS) {
                    content.images.push(relative.to_path_buf());
                } else {
                    debug!(path = %relative.display(), "ignoring file");
                }
                Ok::<_, CollectorError>(())
            },
        )?;

        info!(
            documents = content.documents.len(),
            custom_pages = content.custom_pages.len(),
            images = content.images.len(),
            "collected content"
        );
        Ok(content)
    }

    fn read_document(&self, path: &Path, relative: &Path, ids: &mut DocumentIds) -> Result<Document> {
        let raw = fs::read_to_string(path)?;
        let (metadata, body_markup) = self.parser.split(&raw, relative)?;

        Ok(Document {
            id: ids.next_id(),
            path: derive_page_path(relative),
            source: relative.to_path_buf(),
            metadata,
            body_markup,
            body_html: String::new(),
            toc: Vec::new(),
        })
    }
}

/// Site path of a custom HTML page (`about.html` gives `/about.html`).
pub fn custom_page_path(relative: &Path) -> String {
    derive_page_path(relative)
}

fn claim_output(outputs: &mut BTreeMap<String, PathBuf>, path: &str, source: &Path) -> Result<()> {
    if let Some(first) = outputs.get(path) {
        return Err(CollectorError::DuplicatePath {
            path: path.to_string(),
            first: first.clone(),
            second: source.to_path_buf(),
        });
    }
    outputs.insert(path.to_string(), source.to_path_buf());
    Ok(())
}
