//! Site configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for Docsmith.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Search settings.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Site description for meta tags.
    #[serde(default)]
    pub description: Option<String>,

    /// Base URL pages are served under. May be relative (`/docs/`) or absolute.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Canonical absolute site URL used for the sitemap.
    #[serde(default)]
    pub site_url: Option<String>,

    /// Drop the `.html` suffix from generated links.
    #[serde(default)]
    pub friendly_urls: bool,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding the source documents.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Output directory for generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory whose templates override the built-in ones.
    #[serde(default)]
    pub theme_dir: Option<PathBuf>,

    /// Sandbox root for the `include_raw` helper.
    #[serde(default = "default_includes_dir")]
    pub includes_dir: PathBuf,

    /// Static assets copied to `<output>/assets`.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Navigation file (menu and top bar trees).
    #[serde(default = "default_navigation_file")]
    pub navigation: PathBuf,

    /// Whether to minify HTML output.
    #[serde(default = "default_true")]
    pub minify: bool,

    /// Syntax highlighting theme name.
    #[serde(default = "default_syntax_theme")]
    pub syntax_theme: String,
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Whether search is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Character budget of the content preview in display records.
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

// Default value functions
fn default_title() -> String {
    "Documentation".to_string()
}

fn default_base_url() -> String {
    "/".to_string()
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_includes_dir() -> PathBuf {
    PathBuf::from("includes")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_navigation_file() -> PathBuf {
    PathBuf::from("navigation.yaml")
}

fn default_syntax_theme() -> String {
    "base16-ocean.dark".to_string()
}

fn default_true() -> bool {
    true
}

fn default_preview_length() -> usize {
    300
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: None,
            base_url: default_base_url(),
            site_url: None,
            friendly_urls: false,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            output_dir: default_output_dir(),
            theme_dir: None,
            includes_dir: default_includes_dir(),
            assets_dir: default_assets_dir(),
            navigation: default_navigation_file(),
            minify: true,
            syntax_theme: default_syntax_theme(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preview_length: default_preview_length(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is reported as [`CoreError::NotFound`]; callers decide
    /// whether that is fatal or whether to fall back to [`Config::default`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `DOCSMITH__SECTION__KEY` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("DOCSMITH").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.site.title.is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }

        if self.site.base_url.is_empty() {
            return Err(CoreError::config("site.base_url cannot be empty"));
        }

        if self.search.preview_length == 0 {
            return Err(CoreError::config("search.preview_length must be positive"));
        }

        if let Some(site_url) = &self.site.site_url {
            if !is_absolute_url(site_url) {
                tracing::warn!(site_url, "site.site_url should be an absolute URL");
            }
        }

        Ok(())
    }

    /// Resolve every relative directory against the directory holding the
    /// configuration file.
    #[must_use]
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        join(&mut self.build.content_dir);
        join(&mut self.build.output_dir);
        join(&mut self.build.includes_dir);
        join(&mut self.build.assets_dir);
        join(&mut self.build.navigation);
        if let Some(theme) = self.build.theme_dir.as_mut() {
            join(theme);
        }
        self
    }

    /// Link target for a page path (`/guides/setup.html`), honouring the
    /// base URL and friendly-URL policy.
    #[must_use]
    pub fn page_href(&self, page_path: &str) -> String {
        let path = if self.site.friendly_urls {
            friendly_path(page_path)
        } else {
            page_path.trim_start_matches('/').to_string()
        };
        join_url(&self.site.base_url, &path)
    }
}

/// Whether a URL carries a scheme (`https://`, `mailto:`...) or is
/// protocol-relative.
#[must_use]
pub fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.find(':') {
        Some(pos) if pos > 0 => url[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// Join a base URL and a relative path without doubling the separator.
///
/// Absolute paths (`https://...`) are returned unchanged.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    }
}

/// Page path with the leading slash and the `.html` suffix stripped;
/// `index` pages map to their directory.
fn friendly_path(page_path: &str) -> String {
    let trimmed = page_path.trim_start_matches('/');
    let stem = trimmed.strip_suffix(".html").unwrap_or(trimmed);
    if stem == "index" {
        String::new()
    } else if let Some(dir) = stem.strip_suffix("/index") {
        format!("{dir}/")
    } else {
        stem.to_string()
    }
}
