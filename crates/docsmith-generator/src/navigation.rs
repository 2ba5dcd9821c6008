//! Navigation tree rendering.
//!
//! Exposed to templates as `navigation(tree="menu", current=page.path)`.

use std::{collections::HashMap, sync::Arc};

use docsmith_core::{Config, NavEntry, NavTarget, Navigation, target_page_path};
use docsmith_parser::escape_html;
use tera::Value;

/// Renders a navigation tree as nested lists.
#[derive(Debug, Clone)]
pub struct NavigationRenderer {
    navigation: Arc<Navigation>,
    config: Arc<Config>,
}

impl NavigationRenderer {
    pub fn new(navigation: Arc<Navigation>, config: Arc<Config>) -> Self {
        Self { navigation, config }
    }

    /// Render the tree named `tree`; `current` is the path of the page being
    /// rendered. Returns `None` for an unknown tree name.
    pub fn render(&self, tree: &str, current: &str) -> Option<String> {
        let entries = self.navigation.tree(tree)?;
        let mut html = String::new();
        self.render_list(entries, current, &format!("nav-tree nav-{tree}"), &mut html);
        Some(html)
    }

    fn render_list(&self, entries: &[NavEntry], current: &str, class: &str, out: &mut String) {
        let mut items = String::new();
        for entry in entries {
            self.render_entry(entry, current, &mut items);
        }
        if items.is_empty() {
            return;
        }
        out.push_str(&format!("<ul class=\"{class}\">\n{items}</ul>\n"));
    }

    fn render_entry(&self, entry: &NavEntry, current: &str, out: &mut String) {
        match entry {
            NavEntry::Leaf {
                title,
                target,
                badge,
                ..
            } => {
                let active = entry.targets_page(current);
                out.push_str(&format!(
                    "<li class=\"nav-item\"><a class=\"nav-link{}\" href=\"{}\"{}>{}</a>",
                    if active { " active" } else { "" },
                    escape_html(&self.href(target)),
                    if active { " aria-current=\"page\"" } else { "" },
                    escape_html(title),
                ));
                if let Some(badge) = badge {
                    out.push_str(&format!(
                        " <span class=\"badge text-bg-secondary\">{}</span>",
                        escape_html(badge)
                    ));
                }
                out.push_str("</li>\n");
            }
            NavEntry::Branch {
                title,
                entries,
                open,
            } => {
                let mut children = String::new();
                self.render_list(entries, current, "nav-children", &mut children);
                if children.is_empty() {
                    return;
                }
                let open = *open || entry.contains_page(current);
                out.push_str(&format!(
                    "<li class=\"nav-branch\"><details{}><summary>{}</summary>\n{children}</details></li>\n",
                    if open { " open" } else { "" },
                    escape_html(title),
                ));
            }
        }
    }

    fn href(&self, target: &NavTarget) -> String {
        match target {
            NavTarget::External(url) => url.clone(),
            NavTarget::Document(path) => self.config.page_href(&target_page_path(path)),
        }
    }
}

impl tera::Function for NavigationRenderer {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let tree = args.get("tree").and_then(Value::as_str).unwrap_or("menu");
        let current = args.get("current").and_then(Value::as_str).unwrap_or("");

        self.render(tree, current).map(Value::String).ok_or_else(|| {
            tera::Error::msg(format!(
                "navigation: unknown tree `{tree}` (expected menu or topbar)"
            ))
        })
    }

    fn is_safe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV: &str = r#"
menu:
  - title: Introduction
    path: index.md
  - title: Guides
    entries:
      - title: Setup
        path: guides/setup.md
        badge: new
      - title: Deep
        entries:
          - title: Internals
            path: guides/deep/internals.md
  - title: Empty
    entries: []
topbar:
  - title: GitHub
    url: https://github.com/docsmith-rs/docsmith
"#;

    fn renderer(friendly: bool) -> NavigationRenderer {
        let mut config = Config::default();
        config.site.base_url = "/docs/".to_string();
        config.site.friendly_urls = friendly;
        NavigationRenderer::new(
            Arc::new(Navigation::from_yaml_str(NAV).unwrap()),
            Arc::new(config),
        )
    }

    #[test]
    fn test_render_menu() {
        let html = renderer(false).render("menu", "").unwrap();
        assert!(html.starts_with("<ul class=\"nav-tree nav-menu\">"));
        assert!(html.contains("href=\"/docs/index.html\">Introduction</a>"));
        assert!(html.contains("href=\"/docs/guides/setup.html\">Setup</a>"));
        assert!(html.contains("<span class=\"badge text-bg-secondary\">new</span>"));
        assert!(html.contains("href=\"/docs/guides/deep/internals.html\">Internals</a>"));
        assert!(!html.contains("active"));
        assert!(!html.contains("<details open>"));
    }

    #[test]
    fn test_directory_target_links_to_its_index() {
        let navigation =
            Navigation::from_yaml_str("menu:\n  - title: Guides\n    path: guides/\n").unwrap();
        let mut config = Config::default();
        config.site.base_url = "/docs/".to_string();
        let renderer = NavigationRenderer::new(Arc::new(navigation), Arc::new(config));

        let html = renderer.render("menu", "/guides/index.html").unwrap();
        assert!(html.contains("href=\"/docs/guides/index.html\""));
        assert!(html.contains("nav-link active"));
    }

    #[test]
    fn test_empty_branch_renders_nothing() {
        let html = renderer(false).render("menu", "").unwrap();
        assert!(!html.contains("Empty"));
    }

    #[test]
    fn test_current_page_is_active_and_open() {
        let html = renderer(false)
            .render("menu", "/guides/deep/internals.html")
            .unwrap();
        assert_eq!(html.matches("nav-link active").count(), 1);
        assert!(html.contains("aria-current=\"page\">Internals</a>"));
        assert_eq!(html.matches("<details open>").count(), 2);
    }

    #[test]
    fn test_friendly_hrefs() {
        let html = renderer(true).render("menu", "").unwrap();
        assert!(html.contains("href=\"/docs/\">Introduction</a>"));
        assert!(html.contains("href=\"/docs/guides/setup\">Setup</a>"));
    }

    #[test]
    fn test_topbar_external_link() {
        let html = renderer(false).render("topbar", "").unwrap();
        assert!(html.contains("href=\"https://github.com/docsmith-rs/docsmith\">GitHub</a>"));
    }

    #[test]
    fn test_unknown_tree() {
        let r = renderer(false);
        assert!(r.render("sidebar", "").is_none());

        let mut args = HashMap::new();
        args.insert("tree".to_string(), Value::String("sidebar".to_string()));
        assert!(tera::Function::call(&r, &args).is_err());
    }

    #[test]
    fn test_deep_nesting() {
        let mut yaml = String::from("menu:\n");
        let mut indent = String::from("  ");
        for depth in 0..40 {
            yaml.push_str(&format!("{indent}- title: Level {depth}\n{indent}  entries:\n"));
            indent.push_str("    ");
        }
        yaml.push_str(&format!("{indent}- title: Leaf\n{indent}  path: leaf.md\n"));

        let r = NavigationRenderer::new(
            Arc::new(Navigation::from_yaml_str(&yaml).unwrap()),
            Arc::new(Config::default()),
        );
        let html = r.render("menu", "/leaf.html").unwrap();
        assert_eq!(html.matches("<details open>").count(), 40);
        assert!(html.contains("Leaf</a>"));
    }
}
