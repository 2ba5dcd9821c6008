//! Docsmith Search Library
//!
//! Builds the client-side search artifacts of a site: an inverted index over
//! document titles, raw markup and paths, a display record per indexed
//! document, and a metadata file with content hashes for cache busting.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use docsmith_core::Navigation;
//! use docsmith_search::SearchIndexBuilder;
//!
//! # fn run(documents: Vec<docsmith_core::Document>) -> docsmith_search::Result<()> {
//! let bundle = SearchIndexBuilder::default().build(&documents, &Navigation::default());
//! bundle.write_to(Path::new("public"))?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod index;

pub use builder::{
    DisplayRecord, SearchBundle, SearchIndexBuilder, SearchMeta, is_excluded, resolve_title,
    resolve_title_with,
};
pub use index::{SearchIndex, SearchIndexEntry, tokenize_text};
use thiserror::Error;

/// Search-related errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
