//! Sitemap generation.
//!
//! Generates XML sitemaps for search engine optimization.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use docsmith_core::{Config, Document, config::is_absolute_url};
use thiserror::Error;
use tracing::debug;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

const CHANGEFREQ: &str = "weekly";
const PRIORITY: &str = "0.5";

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// URL location.
    pub loc: String,

    /// Last modification date, `YYYY-MM-DD`.
    pub lastmod: String,
}

/// Sitemap generator.
#[derive(Debug)]
pub struct SitemapGenerator {
    site_url: String,
    friendly_urls: bool,
    source_root: PathBuf,
}

impl SitemapGenerator {
    /// Create a generator for the site in `config`; document sources are
    /// looked up under `source_root` for their modification time.
    #[must_use]
    pub fn new(config: &Config, source_root: impl Into<PathBuf>) -> Self {
        Self {
            site_url: resolve_site_url(config),
            friendly_urls: config.site.friendly_urls,
            source_root: source_root.into(),
        }
    }

    /// Generate sitemap XML, one `<url>` per document.
    pub fn generate(&self, documents: &[Document]) -> String {
        debug!(count = documents.len(), site_url = %self.site_url, "generating sitemap");

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');

        for doc in documents {
            xml.push_str(&url_to_xml(&self.entry(doc)));
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Generate and write the sitemap to `path`.
    pub fn write_to(&self, documents: &[Document], path: &Path) -> Result<()> {
        fs::write(path, self.generate(documents))?;
        Ok(())
    }

    /// Sitemap entry of one document.
    pub fn entry(&self, doc: &Document) -> SitemapEntry {
        SitemapEntry {
            loc: self.page_url(&doc.path),
            lastmod: self.last_modified(&doc.source),
        }
    }

    /// Absolute URL of a page path (`/guides/setup.html`).
    pub fn page_url(&self, path: &str) -> String {
        let stripped = path.strip_prefix('/').unwrap_or(path);
        let clean = if self.friendly_urls {
            stripped.strip_suffix(".html").unwrap_or(stripped)
        } else {
            stripped
        };

        let is_root = clean == "index" || clean == "index.html" || path == "/index.html";
        let url = if is_root {
            format!("{}/", self.site_url)
        } else {
            format!("{}/{clean}", self.site_url)
        };

        if is_absolute_url(&self.site_url) {
            url
        } else {
            collapse_slashes(&url)
        }
    }

    fn last_modified(&self, source: &Path) -> String {
        let modified = fs::metadata(self.source_root.join(source))
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from);
        match modified {
            Ok(time) => time.format("%Y-%m-%d").to_string(),
            Err(e) => {
                debug!(source = %source.display(), error = %e, "no modification time, using today");
                Utc::now().format("%Y-%m-%d").to_string()
            }
        }
    }
}

/// Site URL for the sitemap: `site_url`, else an absolute `base_url` without
/// a trailing `index.html`, else `base_url` as configured.
pub fn resolve_site_url(config: &Config) -> String {
    if let Some(site_url) = config.site.site_url.as_deref().filter(|u| !u.is_empty()) {
        return site_url.trim_end_matches('/').to_string();
    }

    let base = config.site.base_url.as_str();
    if is_absolute_url(base) {
        let base = base.strip_suffix("index.html").unwrap_or(base);
        return base.trim_end_matches('/').to_string();
    }

    base.to_string()
}

fn collapse_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Convert a URL entry to XML.
fn url_to_xml(entry: &SitemapEntry) -> String {
    let mut xml = String::from("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
    xml.push_str(&format!("    <lastmod>{}</lastmod>\n", entry.lastmod));
    xml.push_str(&format!("    <changefreq>{CHANGEFREQ}</changefreq>\n"));
    xml.push_str(&format!("    <priority>{PRIORITY}</priority>\n"));
    xml.push_str("  </url>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use docsmith_core::{Metadata, derive_page_path};
    use tempfile::TempDir;

    use super::*;

    fn doc(id: u32, source: &str) -> Document {
        Document {
            id,
            path: derive_page_path(Path::new(source)),
            source: PathBuf::from(source),
            metadata: Metadata::default(),
            body_markup: String::new(),
            body_html: String::new(),
            toc: Vec::new(),
        }
    }

    fn config(base_url: &str, site_url: Option<&str>, friendly: bool) -> Config {
        let mut config = Config::default();
        config.site.base_url = base_url.to_string();
        config.site.site_url = site_url.map(str::to_string);
        config.site.friendly_urls = friendly;
        config
    }

    #[test]
    fn test_resolve_site_url() {
        assert_eq!(
            resolve_site_url(&config("/", Some("https://example.com/"), false)),
            "https://example.com"
        );
        assert_eq!(
            resolve_site_url(&config("https://example.com/docs/index.html", None, false)),
            "https://example.com/docs"
        );
        assert_eq!(resolve_site_url(&config("/docs/", None, false)), "/docs/");
    }

    #[test]
    fn test_friendly_urls() {
        let generator =
            SitemapGenerator::new(&config("/", Some("https://example.com"), true), "/content");
        assert_eq!(generator.page_url("/index.html"), "https://example.com/");
        assert_eq!(
            generator.page_url("/guides/setup.html"),
            "https://example.com/guides/setup"
        );
    }

    #[test]
    fn test_plain_urls() {
        let generator =
            SitemapGenerator::new(&config("/", Some("https://example.com"), false), "/content");
        assert_eq!(generator.page_url("/index.html"), "https://example.com/");
        assert_eq!(
            generator.page_url("/guides/setup.html"),
            "https://example.com/guides/setup.html"
        );
        assert_eq!(
            generator.page_url("/guides/index.html"),
            "https://example.com/guides/index.html"
        );
    }

    #[test]
    fn test_relative_site_collapses_slashes() {
        let generator = SitemapGenerator::new(&config("/", None, true), "/content");
        assert_eq!(generator.page_url("/index.html"), "/");
        assert_eq!(generator.page_url("/guides/setup.html"), "/guides/setup");

        let generator = SitemapGenerator::new(&config("/docs/", None, false), "/content");
        assert_eq!(generator.page_url("/index.html"), "/docs/");
        assert_eq!(generator.page_url("/a/b.html"), "/docs/a/b.html");
    }

    #[test]
    fn test_lastmod_from_source_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.md"), "# Page").unwrap();
        let generator = SitemapGenerator::new(&config("/", Some("https://example.com"), false), dir.path());

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let entry = generator.entry(&doc(0, "page.md"));
        assert_eq!(entry.lastmod.len(), 10);
        assert_eq!(entry.lastmod, today);

        let missing = generator.entry(&doc(1, "missing.md"));
        assert_eq!(missing.lastmod, today);
    }

    #[test]
    fn test_generate_xml() {
        let dir = TempDir::new().unwrap();
        let generator =
            SitemapGenerator::new(&config("/", Some("https://example.com"), true), dir.path());
        let docs = vec![doc(0, "index.md"), doc(1, "guides/setup.md"), doc(2, "a&b.md")];

        let xml = generator.generate(&docs);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/guides/setup</loc>"));
        assert!(xml.contains("<loc>https://example.com/a&amp;b</loc>"));
        assert_eq!(xml.matches("<url>").count(), 3);
        assert_eq!(xml.matches("<changefreq>weekly</changefreq>").count(), 3);
        assert_eq!(xml.matches("<priority>0.5</priority>").count(), 3);
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn test_write_to() {
        let dir = TempDir::new().unwrap();
        let generator = SitemapGenerator::new(&Config::default(), dir.path());
        let out = dir.path().join("sitemap.xml");
        generator.write_to(&[doc(0, "index.md")], &out).unwrap();
        assert!(fs::read_to_string(out).unwrap().contains("<loc>/</loc>"));
    }
}
