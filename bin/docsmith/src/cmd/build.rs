//! Build command - generates the documentation site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use docsmith_generator::Builder;

use crate::load_config;

/// Run the build command.
///
/// Renders every page, the search files and the sitemap into the output
/// directory. `output` overrides `build.output_dir` from the configuration.
pub fn run(config_path: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, "Starting build");

    let mut config = load_config(config_path)?;
    if let Some(output) = output {
        tracing::info!(output = %output.display(), "Overriding output directory from CLI");
        config.build.output_dir = output.to_path_buf();
    }
    let output_dir = config.build.output_dir.clone();

    let stats = Builder::new(config).build().wrap_err("Build failed")?;

    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Pages:        {}", stats.pages);
    println!("  Custom pages: {}", stats.custom_pages);
    println!("  Indexed:      {}", stats.indexed);
    println!("  Assets:       {}", stats.assets);
    println!("  Images:       {}", stats.images);
    println!();
    println!("  Duration:     {:.2}s", duration.as_secs_f64());
    println!("  Output:       {}", output_dir.display());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_build_with_output_override() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("docsmith.toml");
        fs::write(&config, "[site]\ntitle = \"CLI\"\n").unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("content/index.md"), "# Welcome\n").unwrap();

        let output = dir.path().join("dist");
        run(Some(&config), Some(&output)).unwrap();

        assert!(output.join("index.html").exists());
        assert!(output.join("sitemap.xml").exists());
        assert!(!dir.path().join("public").exists());
    }

    #[test]
    fn test_build_fails_on_malformed_metadata() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("docsmith.toml");
        fs::write(&config, "[site]\ntitle = \"CLI\"\n").unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(
            dir.path().join("content/index.md"),
            "---\ntitle: [broken\n---\nBody\n",
        )
        .unwrap();

        assert!(run(Some(&config), None).is_err());
    }
}
