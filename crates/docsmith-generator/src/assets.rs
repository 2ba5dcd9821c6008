//! Static asset and content image copying.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::walk::walk_files;

/// Asset processing errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Copy every file under `source_dir` into `dest_dir`, keeping the layout.
/// A missing source directory copies nothing.
pub fn copy_assets(source_dir: &Path, dest_dir: &Path) -> Result<usize> {
    info!(
        source = %source_dir.display(),
        dest = %dest_dir.display(),
        "copying assets"
    );

    let count = walk_files(source_dir, |_| true, |path, relative| {
        copy_file(path, &dest_dir.join(relative))
    })?;

    info!(count, "assets copied");
    Ok(count)
}

/// Copy images found during discovery from the content tree to the output,
/// next to the pages that reference them.
pub fn copy_images(content_dir: &Path, images: &[PathBuf], output_dir: &Path) -> Result<usize> {
    for image in images {
        copy_file(&content_dir.join(image), &output_dir.join(image))?;
    }
    debug!(count = images.len(), "images copied");
    Ok(images.len())
}

/// Copy a single file, creating parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    debug!(source = %source.display(), dest = %dest.display(), "copied file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_copy_assets() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("css")).unwrap();
        fs::write(source.path().join("css/site.css"), "body {}").unwrap();
        fs::write(source.path().join("app.js"), "console.log(1)").unwrap();
        fs::write(source.path().join(".hidden"), "x").unwrap();

        let count = copy_assets(source.path(), &dest.path().join("assets")).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(dest.path().join("assets/css/site.css")).unwrap(),
            "body {}"
        );
        assert!(dest.path().join("assets/app.js").exists());
        assert!(!dest.path().join("assets/.hidden").exists());
    }

    #[test]
    fn test_copy_assets_missing_source() {
        let dest = TempDir::new().unwrap();
        let count = copy_assets(Path::new("/nonexistent/docsmith/assets"), dest.path()).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_copy_images() {
        let content = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::create_dir_all(content.path().join("guides/img")).unwrap();
        fs::write(content.path().join("guides/img/shot.png"), [0u8, 1, 2]).unwrap();

        let images = vec![PathBuf::from("guides/img/shot.png")];
        assert_eq!(copy_images(content.path(), &images, output.path()).unwrap(), 1);
        assert_eq!(
            fs::read(output.path().join("guides/img/shot.png")).unwrap(),
            vec![0u8, 1, 2]
        );
    }
}
