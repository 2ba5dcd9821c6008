//! Docsmith Core Library
//!
//! Core types, configuration, navigation model and error handling for the
//! Docsmith documentation site generator.

pub mod config;
pub mod content;
pub mod error;
pub mod frontmatter;
pub mod navigation;

pub use config::Config;
pub use content::{Document, DocumentIds, TocEntry, derive_page_path};
pub use error::{CoreError, Result};
pub use frontmatter::Metadata;
pub use navigation::{NavEntry, NavTarget, Navigation, target_page_path};
