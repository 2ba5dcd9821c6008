//! Directory traversal shared by discovery and the asset and image copies.

use std::{io, path::Path};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Visit every regular file under `root` accepted by `filter`, in file name
/// order.
///
/// The visitor receives the full path and the path relative to `root`.
/// Hidden files and directories are skipped. A missing root visits nothing.
/// Returns the number of visited files.
pub fn walk_files<F, V, E>(root: &Path, filter: F, mut visitor: V) -> Result<usize, E>
where
    F: Fn(&Path) -> bool,
    V: FnMut(&Path, &Path) -> Result<(), E>,
    E: From<io::Error>,
{
    if !root.exists() {
        debug!(root = %root.display(), "directory does not exist, skipping");
        return Ok(0);
    }

    let mut count = 0;
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_str().unwrap_or_default();
        if IGNORED_FILES.contains(&name) {
            continue;
        }

        let path = entry.path();
        if !filter(path) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        visitor(path, relative)?;
        count += 1;
    }

    Ok(count)
}

/// Filter on the lower-cased file extension.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.contains(&ext.to_ascii_lowercase().as_str()))
}
