//! Docsmith Generator Library
//!
//! Static site generation engine for Docsmith.
//!
//! # Modules
//!
//! - [`template`] - Tera layouts, partials and per-render scoping
//! - [`helpers`] - template helpers (alerts, badges, search widget...)
//! - [`include`] - raw HTML includes and their placeholder tokens
//! - [`navigation`] - navigation tree rendering
//! - [`collector`] - content discovery
//! - [`sitemap`] - XML sitemap generation
//! - [`minify`] - HTML minification
//! - [`assets`] - static asset and image copying
//! - [`build`] - build orchestration

pub mod assets;
pub mod build;
pub mod collector;
pub mod helpers;
pub mod include;
pub mod minify;
pub mod navigation;
pub mod sitemap;
pub mod template;
pub mod walk;

pub use build::{BuildError, BuildStats, Builder, CheckReport};
pub use collector::{ContentCollector, SiteContent};
pub use include::IncludeScratch;
pub use minify::minify;
pub use navigation::NavigationRenderer;
pub use sitemap::SitemapGenerator;
pub use template::{TemplateEngine, TemplateError};
