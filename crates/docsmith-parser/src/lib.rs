//! Docsmith Parser Library
//!
//! Splits source documents into metadata and body, and renders Markdown
//! bodies to HTML with anchored headings, responsive images, highlighted
//! code and tabbed sample groups.

pub mod markdown;
pub mod syntax;
mod tabs;

use std::path::{Path, PathBuf};

use docsmith_core::CoreError;
pub use markdown::{
    BodyTemplater, MarkdownParser, OneOffTemplater, ParsedContent, slugify,
    unwrap_single_paragraph,
};
pub use syntax::SyntaxHighlighter;
use thiserror::Error;

/// Parser errors. Any of them aborts the build.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Metadata block could not be decoded.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A body marked as template failed to compile or render.
    #[error("template error in {path}: {message}")]
    Template { path: PathBuf, message: String },
}

impl ParserError {
    /// Template error carrying the whole cause chain in its message.
    pub fn template(path: &Path, error: &(dyn std::error::Error + 'static)) -> Self {
        Self::Template {
            path: path.to_path_buf(),
            message: error_chain(error),
        }
    }
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Join an error and its sources into one line.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
