//! Docsmith CLI Library
//!
//! Command implementations and start-up helpers for the `docsmith` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use docsmith::cmd;
//!
//! // Build a documentation site
//! cmd::build::run(Some(Path::new("docsmith.toml")), None).unwrap();
//! ```

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};

pub mod cmd;

pub use docsmith_core::Config;
pub use docsmith_generator::{BuildStats, Builder, CheckReport};

/// Configuration file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "docsmith.toml";

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// `RUST_LOG` directives are honoured on top of the level.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Load the site configuration.
///
/// An explicitly requested file must exist. Without one, `docsmith.toml` in
/// the working directory is used when present, otherwise the defaults. Every
/// relative directory in the result is resolved against the directory that
/// holds the configuration file.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
    let root = config_root(&path);

    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) if explicit.is_none() && e.is_not_found() => {
            tracing::warn!(
                path = %path.display(),
                "configuration file not found, using defaults"
            );
            Config::default()
        }
        Err(e) => {
            return Err(e)
                .wrap_err_with(|| format!("Failed to load configuration from {}", path.display()));
        }
    };

    tracing::debug!(?config, root = %root.display(), "loaded configuration");
    Ok(config.rooted_at(&root))
}

fn config_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_explicit_config_is_rooted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docsmith.toml");
        fs::write(
            &path,
            "[site]\ntitle = \"Guide\"\nbase_url = \"/docs/\"\n\n[build]\noutput_dir = \"dist\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.site.title, "Guide");
        assert_eq!(config.build.output_dir, dir.path().join("dist"));
        assert_eq!(config.build.content_dir, dir.path().join("content"));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = load_config(Some(&dir.path().join("missing.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docsmith.toml");
        fs::write(&path, "[site]\ntitle = \"\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_config_root() {
        assert_eq!(config_root(Path::new("docsmith.toml")), PathBuf::from("."));
        assert_eq!(
            config_root(Path::new("site/docsmith.toml")),
            PathBuf::from("site")
        );
    }
}
