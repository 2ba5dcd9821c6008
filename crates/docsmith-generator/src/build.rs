//! Build orchestration.
//!
//! Coordinates the full site build process.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use docsmith_core::{Config, CoreError, Document, Navigation, TocEntry};
use docsmith_parser::{MarkdownParser, ParserError, escape_html};
use docsmith_search::{SearchError, SearchIndexBuilder, resolve_title_with};
use rayon::prelude::*;
use serde::Serialize;
use tera::Context;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{self, AssetError},
    collector::{CollectorError, ContentCollector, SiteContent, custom_page_path},
    include::IncludeScratch,
    minify::minify,
    sitemap::{SitemapError, SitemapGenerator},
    template::{TemplateEngine, TemplateError},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Navigation file could not be loaded.
    #[error("navigation error: {0}")]
    Navigation(#[from] CoreError),

    /// Collector error.
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// A document body failed to render.
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Search index error.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Sitemap generation error.
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of document pages generated.
    pub pages: usize,

    /// Number of custom HTML pages written.
    pub custom_pages: usize,

    /// Number of documents in the search index.
    pub indexed: usize,

    /// Number of assets copied.
    pub assets: usize,

    /// Number of content images copied.
    pub images: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// What a dry run found.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub documents: usize,
    pub custom_pages: usize,
    pub images: usize,
    pub searchable: usize,
}

/// Site-wide template variables.
#[derive(Debug, Serialize)]
struct SiteContext<'a> {
    title: &'a str,
    description: Option<&'a str>,
    base_url: &'a str,
    site_url: Option<&'a str>,
    friendly_urls: bool,
    search_enabled: bool,
}

/// Per-page template variables.
#[derive(Debug, Serialize)]
struct PageContext<'a> {
    id: Option<u32>,
    path: &'a str,
    href: String,
    title: String,
    description: Option<String>,
    content: &'a str,
    toc: &'a [TocEntry],
}

/// One rendered document page.
#[derive(Debug)]
struct RenderedPage {
    html: String,
    body_html: String,
    toc: Vec<TocEntry>,
}

/// Everything loaded before pages are rendered.
struct Prepared {
    navigation: Arc<Navigation>,
    content: SiteContent,
    engine: TemplateEngine,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    config: Arc<Config>,
    parser: Arc<MarkdownParser>,
}

impl Builder {
    /// Create a new builder. Directories are taken from `config.build` as
    /// they are; see [`Config::rooted_at`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        let parser = MarkdownParser::with_theme(&config.build.syntax_theme);
        Self {
            config: Arc::new(config),
            parser: Arc::new(parser),
        }
    }

    fn content_dir(&self) -> &Path {
        &self.config.build.content_dir
    }

    fn output_dir(&self) -> &Path {
        &self.config.build.output_dir
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(
            content = %self.content_dir().display(),
            output = %self.output_dir().display(),
            "starting build"
        );

        // 1. Clean output directory
        self.clean_output()?;

        // 2. Load navigation, collect content, compile templates
        let Prepared {
            navigation,
            mut content,
            engine,
        } = self.prepare()?;

        // 3. Render and write document pages
        let rendered = self.render_documents(&engine, &content.documents)?;
        stats.pages = self.write_pages(&content.documents, &rendered)?;
        for (doc, page) in content.documents.iter_mut().zip(rendered) {
            doc.body_html = page.body_html;
            doc.toc = page.toc;
        }

        // 4. Custom HTML pages
        stats.custom_pages = self.generate_custom_pages(&engine, &content.custom_pages)?;

        // 5. Search index
        if self.config.search.enabled {
            stats.indexed = self.generate_search(&content.documents, &navigation)?;
        }

        // 6. Sitemap
        self.generate_sitemap(&content.documents)?;

        // 7. Assets and content images
        stats.assets = assets::copy_assets(
            &self.config.build.assets_dir,
            &self.output_dir().join("assets"),
        )?;
        stats.images = assets::copy_images(self.content_dir(), &content.images, self.output_dir())?;

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            pages = stats.pages,
            custom_pages = stats.custom_pages,
            indexed = stats.indexed,
            assets = stats.assets,
            images = stats.images,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Parse and render everything without writing output.
    pub fn check(&self) -> Result<CheckReport> {
        let Prepared {
            navigation,
            content,
            engine,
        } = self.prepare()?;

        self.render_documents(&engine, &content.documents)?;
        let searchable = content
            .documents
            .iter()
            .filter(|doc| !docsmith_search::is_excluded(doc, &navigation))
            .count();

        Ok(CheckReport {
            documents: content.documents.len(),
            custom_pages: content.custom_pages.len(),
            images: content.images.len(),
            searchable,
        })
    }

    /// Clean the output directory.
    fn clean_output(&self) -> Result<()> {
        let output = self.output_dir();
        if output.exists() {
            debug!(dir = %output.display(), "cleaning output directory");
            fs::remove_dir_all(output)?;
        }
        fs::create_dir_all(output)?;
        Ok(())
    }

    fn prepare(&self) -> Result<Prepared> {
        let navigation = Arc::new(self.load_navigation()?);
        let content = ContentCollector::new(&self.parser, self.content_dir()).collect()?;
        let engine = TemplateEngine::new(
            Arc::clone(&self.config),
            Arc::clone(&navigation),
            Arc::clone(&self.parser),
        )?;

        Ok(Prepared {
            navigation,
            content,
            engine,
        })
    }

    fn load_navigation(&self) -> Result<Navigation> {
        match Navigation::load(&self.config.build.navigation) {
            Ok(navigation) => Ok(navigation),
            Err(e) if e.is_not_found() => {
                debug!(
                    path = %self.config.build.navigation.display(),
                    "no navigation file, using empty menus"
                );
                Ok(Navigation::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn site_context(&self) -> SiteContext<'_> {
        let site = &self.config.site;
        SiteContext {
            title: &site.title,
            description: site.description.as_deref(),
            base_url: &site.base_url,
            site_url: site.site_url.as_deref(),
            friendly_urls: site.friendly_urls,
            search_enabled: self.config.search.enabled,
        }
    }

    /// Render every document in parallel. The first failure aborts.
    fn render_documents(
        &self,
        engine: &TemplateEngine,
        documents: &[Document],
    ) -> Result<Vec<RenderedPage>> {
        info!(count = documents.len(), "rendering pages");
        documents
            .par_iter()
            .map(|doc| self.render_document(engine, doc))
            .collect()
    }

    fn render_document(&self, engine: &TemplateEngine, doc: &Document) -> Result<RenderedPage> {
        let scratch = IncludeScratch::new();

        let templater = engine.body_templater(&scratch);
        let (body_html, toc) =
            self.parser
                .render_body(&doc.metadata, &doc.body_markup, &doc.source, &templater)?;
        let body_html = scratch.resolve(&body_html);

        let meta = self.parser.render_metadata(&doc.metadata);
        let page = PageContext {
            id: Some(doc.id),
            path: &doc.path,
            href: self.config.page_href(&doc.path),
            title: escape_html(&resolve_title_with(doc, &toc)),
            description: doc.metadata.description().map(escape_html),
            content: &body_html,
            toc: &toc,
        };

        let mut context = Context::new();
        context.insert("site", &self.site_context());
        context.insert("page", &page);
        context.insert("meta", &meta);

        let html = engine.render(doc.metadata.layout(), &context, &scratch)?;
        let html = self.finalize(scratch.finish(html));
        debug!(path = %doc.path, "rendered page");

        Ok(RenderedPage {
            html,
            body_html,
            toc,
        })
    }

    fn finalize(&self, html: String) -> String {
        if self.config.build.minify {
            minify(&html)
        } else {
            html
        }
    }

    fn output_path(&self, page_path: &str) -> PathBuf {
        self.output_dir().join(page_path.trim_start_matches('/'))
    }

    fn write_pages(&self, documents: &[Document], rendered: &[RenderedPage]) -> Result<usize> {
        documents
            .par_iter()
            .zip(rendered.par_iter())
            .map(|(doc, page)| {
                write_file(&self.output_path(&doc.path), &page.html)?;
                debug!(path = %doc.path, "wrote page");
                Ok(())
            })
            .collect::<Result<Vec<()>>>()
            .map(|written| written.len())
    }

    /// Custom HTML pages are templates; one that fails to render is copied
    /// verbatim.
    fn generate_custom_pages(&self, engine: &TemplateEngine, pages: &[PathBuf]) -> Result<usize> {
        for relative in pages {
            let raw = fs::read_to_string(self.content_dir().join(relative))?;
            let path = custom_page_path(relative);
            let scratch = IncludeScratch::new();

            let page = PageContext {
                id: None,
                path: &path,
                href: self.config.page_href(&path),
                title: String::new(),
                description: None,
                content: "",
                toc: &[],
            };
            let mut context = Context::new();
            context.insert("site", &self.site_context());
            context.insert("page", &page);

            let html = match engine.render_str(&path, &raw, &context, &scratch) {
                Ok(html) => self.finalize(scratch.finish(html)),
                Err(e) => {
                    warn!(path = %path, error = %e, "failed to render custom page, copying it verbatim");
                    raw
                }
            };
            write_file(&self.output_path(&path), &html)?;
            debug!(path = %path, "wrote custom page");
        }

        Ok(pages.len())
    }

    fn generate_search(&self, documents: &[Document], navigation: &Navigation) -> Result<usize> {
        let bundle =
            SearchIndexBuilder::new(self.config.search.preview_length).build(documents, navigation);
        let meta = bundle.write_to(self.output_dir())?;
        Ok(meta.document_count)
    }

    /// Generate sitemap.
    fn generate_sitemap(&self, documents: &[Document]) -> Result<()> {
        let generator = SitemapGenerator::new(&self.config, self.content_dir());
        let output_path = self.output_dir().join("sitemap.xml");
        generator.write_to(documents, &output_path)?;

        info!(path = %output_path.display(), "generated sitemap");
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
