//! Tera-based page templates.
//!
//! Layouts live under `layouts/` and extend `layouts/base.html`, overriding
//! its `head`, `body` and `scripts` blocks; shared fragments live under
//! `partials/`. Built-in templates are embedded in the binary and a theme
//! directory may override or add to them.
//!
//! Each render works on its own clone of the compiled templates with
//! `include_raw` bound to that render's [`IncludeScratch`], so pages can be
//! rendered in parallel.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use docsmith_core::{Config, Metadata, Navigation};
use docsmith_parser::{BodyTemplater, MarkdownParser, error_chain};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    helpers,
    include::{IncludeRaw, IncludeScratch},
    navigation::NavigationRenderer,
    walk::{has_extension, walk_files},
};

/// Layout used when a document does not name one.
pub const DEFAULT_LAYOUT: &str = "page";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("layouts/base.html", include_str!("../templates/layouts/base.html")),
    ("layouts/page.html", include_str!("../templates/layouts/page.html")),
    ("partials/navbar.html", include_str!("../templates/partials/navbar.html")),
    ("partials/sidebar.html", include_str!("../templates/partials/sidebar.html")),
    ("partials/toc.html", include_str!("../templates/partials/toc.html")),
];

const INLINE_TEMPLATE: &str = "__inline__";

/// Template errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Templates failed to compile.
    #[error("failed to load templates: {0}")]
    Load(String),

    /// A template failed to render.
    #[error("render error for '{template}': {message}")]
    Render { template: String, message: String },
}

impl TemplateError {
    fn render(template: impl Into<String>, error: &tera::Error) -> Self {
        Self::Render {
            template: template.into(),
            message: error_chain(error),
        }
    }
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Compiled layouts and partials with the site helpers registered.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    tera: Arc<Tera>,
    includes_root: PathBuf,
}

impl TemplateEngine {
    /// Compile the built-in templates, apply theme overrides and register
    /// helpers.
    pub fn new(
        config: Arc<Config>,
        navigation: Arc<Navigation>,
        parser: Arc<MarkdownParser>,
    ) -> Result<Self> {
        let mut sources: BTreeMap<String, String> = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, body)| (name.to_string(), body.to_string()))
            .collect();

        if let Some(theme_dir) = config.build.theme_dir.as_deref() {
            let overrides = load_theme(theme_dir)?;
            debug!(theme = %theme_dir.display(), count = overrides.len(), "loaded theme templates");
            sources.extend(overrides);
        }

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(sources.iter().map(|(name, body)| (name.as_str(), body.as_str())))
            .map_err(|e| TemplateError::Load(error_chain(&e)))?;

        helpers::register(&mut tera, parser);
        tera.register_function(
            "navigation",
            NavigationRenderer::new(navigation, Arc::clone(&config)),
        );

        let includes_root = config.build.includes_dir.clone();
        Ok(Self {
            tera: Arc::new(tera),
            includes_root,
        })
    }

    /// Whether `layouts/<kind>.html` exists.
    pub fn has_layout(&self, kind: &str) -> bool {
        self.tera
            .get_template_names()
            .any(|name| name == layout_name(kind))
    }

    /// Names of all loaded templates, sorted.
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }

    /// A template instance whose `include_raw` writes into `scratch`.
    fn scoped(&self, scratch: &IncludeScratch) -> Tera {
        let mut tera = (*self.tera).clone();
        tera.register_function(
            "include_raw",
            IncludeRaw::new(
                self.includes_root.clone(),
                Arc::clone(&self.tera),
                scratch.clone(),
            ),
        );
        tera
    }

    /// Render the layout for page kind `kind`. Unknown kinds fall back to
    /// the default layout.
    pub fn render(&self, kind: &str, context: &Context, scratch: &IncludeScratch) -> Result<String> {
        let kind = if self.has_layout(kind) {
            kind
        } else {
            warn!(layout = kind, "unknown layout, using `{DEFAULT_LAYOUT}`");
            DEFAULT_LAYOUT
        };
        let name = layout_name(kind);

        self.scoped(scratch)
            .render(&name, context)
            .map_err(|e| TemplateError::render(name, &e))
    }

    /// Render a template given as text. It may extend the loaded layouts.
    pub fn render_str(
        &self,
        label: &str,
        template: &str,
        context: &Context,
        scratch: &IncludeScratch,
    ) -> Result<String> {
        render_inline(&mut self.scoped(scratch), template, context)
            .map_err(|e| TemplateError::render(label, &e))
    }

    /// Body templater for one page, sharing that page's scratch.
    pub fn body_templater<'a>(&'a self, scratch: &'a IncludeScratch) -> ScopedTemplater<'a> {
        ScopedTemplater {
            engine: self,
            scratch,
        }
    }
}

/// Compiles template bodies with the full helper set, including
/// `include_raw` bound to one page's scratch.
#[derive(Debug)]
pub struct ScopedTemplater<'a> {
    engine: &'a TemplateEngine,
    scratch: &'a IncludeScratch,
}

impl BodyTemplater for ScopedTemplater<'_> {
    fn render_body(&self, body: &str, context: &Metadata) -> tera::Result<String> {
        let context = Context::from_serialize(context)?;
        render_inline(&mut self.engine.scoped(self.scratch), body, &context)
    }
}

fn render_inline(tera: &mut Tera, template: &str, context: &Context) -> tera::Result<String> {
    tera.add_raw_template(INLINE_TEMPLATE, template)?;
    tera.render(INLINE_TEMPLATE, context)
}

fn layout_name(kind: &str) -> String {
    format!("layouts/{kind}.html")
}

/// Collect `layouts/**/*.html` and `partials/**/*.html` from a theme.
fn load_theme(theme_dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut templates = BTreeMap::new();

    for section in ["layouts", "partials"] {
        walk_files(
            &theme_dir.join(section),
            |path| has_extension(path, &["html"]),
            |path, relative| {
                let name = format!(
                    "{section}/{}",
                    relative.to_string_lossy().replace('\\', "/")
                );
                templates.insert(name, fs::read_to_string(path)?);
                Ok::<_, TemplateError>(())
            },
        )?;
    }

    Ok(templates)
}
