//! Navigation model: the primary menu and the top bar.
//!
//! Entries are decided once at load time into [`NavEntry::Leaf`] or
//! [`NavEntry::Branch`], so rendering never has to inspect shapes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::is_absolute_url;
use crate::error::{CoreError, Result};

/// Both navigation trees of a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    /// Primary (sidebar) menu.
    #[serde(default)]
    pub menu: Vec<NavEntry>,

    /// Top bar links.
    #[serde(default)]
    pub topbar: Vec<NavEntry>,
}

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub enum NavEntry {
    Leaf {
        title: String,
        target: NavTarget,
        badge: Option<String>,
        exclude_from_search: bool,
    },
    Branch {
        title: String,
        entries: Vec<NavEntry>,
        open: bool,
    },
}

/// What a leaf points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavTarget {
    /// A source document, referenced by its content path (`guides/setup.md`).
    Document(String),
    /// An external or absolute URL, used as-is.
    External(String),
}

/// On-disk shape of an entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exclude_from_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    searchable: Option<bool>,
    #[serde(default, alias = "children", skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<NavEntry>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    open: bool,
}

impl TryFrom<RawEntry> for NavEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
        if let Some(entries) = raw.entries {
            return Ok(Self::Branch {
                title: raw.title,
                entries,
                open: raw.open,
            });
        }

        let target = match (raw.url, raw.path) {
            (Some(url), _) => NavTarget::External(url),
            (None, Some(path)) if is_absolute_url(&path) => NavTarget::External(path),
            (None, Some(path)) => NavTarget::Document(path),
            (None, None) => {
                return Err(format!(
                    "navigation entry '{}' needs `path`, `url` or `entries`",
                    raw.title
                ));
            }
        };

        let exclude_from_search =
            raw.exclude_from_search.unwrap_or(false) || !raw.searchable.unwrap_or(true);

        Ok(Self::Leaf {
            title: raw.title,
            target,
            badge: raw.badge,
            exclude_from_search,
        })
    }
}

impl From<NavEntry> for RawEntry {
    fn from(entry: NavEntry) -> Self {
        match entry {
            NavEntry::Leaf {
                title,
                target,
                badge,
                exclude_from_search,
            } => {
                let (path, url) = match target {
                    NavTarget::Document(p) => (Some(p), None),
                    NavTarget::External(u) => (None, Some(u)),
                };
                Self {
                    title,
                    path,
                    url,
                    badge,
                    exclude_from_search: exclude_from_search.then_some(true),
                    ..Self::default()
                }
            }
            NavEntry::Branch {
                title,
                entries,
                open,
            } => Self {
                title,
                entries: Some(entries),
                open,
                ..Self::default()
            },
        }
    }
}

impl NavEntry {
    pub fn title(&self) -> &str {
        match self {
            Self::Leaf { title, .. } | Self::Branch { title, .. } => title,
        }
    }

    /// Whether this leaf references the document at `page_path`.
    pub fn targets_page(&self, page_path: &str) -> bool {
        match self {
            Self::Leaf {
                target: NavTarget::Document(target),
                ..
            } => normalize_target(target) == normalize_target(page_path),
            _ => false,
        }
    }

    /// Whether this entry is, or contains, a leaf for `page_path`.
    pub fn contains_page(&self, page_path: &str) -> bool {
        match self {
            Self::Leaf { .. } => self.targets_page(page_path),
            Self::Branch { entries, .. } => entries.iter().any(|e| e.contains_page(page_path)),
        }
    }
}

impl Navigation {
    /// Load navigation from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse navigation from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| CoreError::Navigation(e.to_string()))
    }

    /// Look up a tree by name (`menu` or `topbar`).
    pub fn tree(&self, name: &str) -> Option<&[NavEntry]> {
        match name {
            "menu" => Some(&self.menu),
            "topbar" => Some(&self.topbar),
            _ => None,
        }
    }

    /// First leaf, depth first through `menu` and then `topbar`, that
    /// references the document at `page_path`.
    pub fn find_document_entry(&self, page_path: &str) -> Option<&NavEntry> {
        find_in(&self.menu, page_path).or_else(|| find_in(&self.topbar, page_path))
    }

    /// Whether the first entry referencing `page_path` excludes it from search.
    pub fn excludes_from_search(&self, page_path: &str) -> bool {
        matches!(
            self.find_document_entry(page_path),
            Some(NavEntry::Leaf {
                exclude_from_search: true,
                ..
            })
        )
    }
}

fn find_in<'a>(entries: &'a [NavEntry], page_path: &str) -> Option<&'a NavEntry> {
    for entry in entries {
        match entry {
            NavEntry::Leaf { .. } if entry.targets_page(page_path) => return Some(entry),
            NavEntry::Leaf { .. } => {}
            NavEntry::Branch { entries, .. } => {
                if let Some(found) = find_in(entries, page_path) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Normalize a navigation target or page path for comparison.
///
/// `/guides/setup.html`, `guides/setup.md` and `guides/setup` compare equal;
/// an empty path or a directory means its `index`.
pub fn normalize_target(target: &str) -> String {
    let trimmed = target.trim().trim_start_matches('/');
    let stem = [".md", ".markdown", ".html"]
        .iter()
        .find_map(|ext| trimmed.strip_suffix(ext))
        .unwrap_or(trimmed);

    if stem.is_empty() {
        "index".to_string()
    } else if stem.ends_with('/') {
        format!("{stem}index")
    } else {
        stem.to_string()
    }
}

/// Site path of the page a document target points at. Agrees with
/// [`normalize_target`]: `guides/` gives `/guides/index.html`.
pub fn target_page_path(target: &str) -> String {
    format!("/{}.html", normalize_target(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV: &str = r#"
menu:
  - title: Introduction
    path: index.md
  - title: Guides
    open: true
    entries:
      - title: Setup
        path: guides/setup.md
        badge: new
      - title: Internal
        path: guides/internal.md
        searchable: false
      - title: Deep
        entries:
          - title: Nested
            path: /guides/deep/nested.html
  - title: Empty
    entries: []
topbar:
  - title: GitHub
    url: https://github.com/docsmith-rs/docsmith
  - title: Changelog
    path: changelog.md
    excludeFromSearch: true
"#;

    #[test]
    fn test_target_page_path() {
        assert_eq!(target_page_path("guides/setup.md"), "/guides/setup.html");
        assert_eq!(target_page_path("/guides/setup.html"), "/guides/setup.html");
        assert_eq!(target_page_path("guides/"), "/guides/index.html");
        assert_eq!(target_page_path(""), "/index.html");

        for target in ["guides/", "notes/intro.markdown", "index.md"] {
            assert_eq!(normalize_target(&target_page_path(target)), normalize_target(target));
        }
    }

    #[test]
    fn test_parse_navigation() {
        let nav = Navigation::from_yaml_str(NAV).expect("parse");
        assert_eq!(nav.menu.len(), 3);
        assert_eq!(nav.topbar.len(), 2);

        match &nav.menu[1] {
            NavEntry::Branch { title, entries, open } => {
                assert_eq!(title, "Guides");
                assert!(*open);
                assert_eq!(entries.len(), 3);
            }
            other => panic!("expected branch, got {other:?}"),
        }

        match &nav.topbar[0] {
            NavEntry::Leaf { target, .. } => {
                assert_eq!(
                    target,
                    &NavTarget::External("https://github.com/docsmith-rs/docsmith".to_string())
                );
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_entry_without_target_is_rejected() {
        let result = Navigation::from_yaml_str("menu:\n  - title: Orphan\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Orphan"));
    }

    #[test]
    fn test_find_document_entry_depth_first() {
        let nav = Navigation::from_yaml_str(NAV).expect("parse");
        let entry = nav
            .find_document_entry("/guides/deep/nested.html")
            .expect("found");
        assert_eq!(entry.title(), "Nested");

        let entry = nav.find_document_entry("/index.html").expect("found");
        assert_eq!(entry.title(), "Introduction");

        assert!(nav.find_document_entry("/missing.html").is_none());
    }

    #[test]
    fn test_excludes_from_search() {
        let nav = Navigation::from_yaml_str(NAV).expect("parse");
        assert!(nav.excludes_from_search("/guides/internal.html"));
        assert!(nav.excludes_from_search("/changelog.html"));
        assert!(!nav.excludes_from_search("/guides/setup.html"));
        assert!(!nav.excludes_from_search("/unreferenced.html"));
    }

    #[test]
    fn test_first_match_wins() {
        let yaml = r#"
menu:
  - title: Setup
    path: guides/setup.md
topbar:
  - title: Setup again
    path: guides/setup.md
    searchable: false
"#;
        let nav = Navigation::from_yaml_str(yaml).expect("parse");
        assert!(!nav.excludes_from_search("/guides/setup.html"));
    }

    #[test]
    fn test_contains_page() {
        let nav = Navigation::from_yaml_str(NAV).expect("parse");
        assert!(nav.menu[1].contains_page("/guides/deep/nested.html"));
        assert!(!nav.menu[1].contains_page("/index.html"));
        assert!(!nav.menu[2].contains_page("/index.html"));
    }

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("/guides/setup.html"), "guides/setup");
        assert_eq!(normalize_target("guides/setup.md"), "guides/setup");
        assert_eq!(normalize_target("guides/setup.markdown"), "guides/setup");
        assert_eq!(normalize_target("guides/setup"), "guides/setup");
        assert_eq!(normalize_target("/"), "index");
        assert_eq!(normalize_target(""), "index");
        assert_eq!(normalize_target("guides/"), "guides/index");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Navigation::load(Path::new("/nonexistent/navigation.yaml")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_file_is_empty_navigation() {
        let nav = Navigation::from_yaml_str("  \n").expect("parse");
        assert!(nav.menu.is_empty());
        assert!(nav.topbar.is_empty());
    }
}
