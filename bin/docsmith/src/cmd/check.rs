//! Check command - validate configuration, navigation and content

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use docsmith_generator::{Builder, CheckReport};

use crate::load_config;

/// Run the check command.
///
/// Loads everything a build would and renders every page in memory without
/// writing output. With `strict`, a site that has no documents at all, or
/// nothing searchable while search is enabled, fails the check.
pub fn run(config_path: Option<&Path>, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and content");

    println!("Checking configuration...");
    let config = load_config(config_path)?;
    println!("  ✓ Configuration valid");

    let search_enabled = config.search.enabled;

    println!("\nRendering pages...");
    let report = Builder::new(config).check().wrap_err("Check failed")?;
    println!("  ✓ {} documents rendered", report.documents);
    println!("  ✓ {} custom pages", report.custom_pages);
    println!("  ✓ {} images", report.images);

    let warnings = warnings(&report, search_enabled);
    for warn in &warnings {
        println!("  ⚠ {warn}");
    }

    if strict && !warnings.is_empty() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

fn warnings(report: &CheckReport, search_enabled: bool) -> Vec<String> {
    let mut warnings = Vec::new();
    if report.documents == 0 {
        warnings.push("no documents found in the content directory".to_string());
    }
    if search_enabled && report.documents > 0 && report.searchable == 0 {
        warnings.push("search is enabled but every document is excluded".to_string());
    }
    warnings
}
