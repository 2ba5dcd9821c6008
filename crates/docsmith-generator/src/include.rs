//! Raw HTML includes.
//!
//! `include_raw(file="...", data=...)` must survive the markup stage
//! untouched, so the helper only emits an opaque token and parks the HTML in
//! the page's [`IncludeScratch`]. Tokens are swapped back once the page is
//! fully rendered.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tera::{Context, Tera, Value};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of every include token.
pub const TOKEN_PREFIX: &str = "docsmith-include-";

/// How deep includes may nest before the innermost one is dropped.
pub const MAX_INCLUDE_DEPTH: usize = 8;

/// Token to HTML map owned by one page render.
///
/// Clones share the same map, so the handle registered with a template
/// instance fills the scratch the page later finishes.
#[derive(Debug, Clone, Default)]
pub struct IncludeScratch {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl IncludeScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, String)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Park `html` and return the token standing in for it.
    pub fn insert(&self, html: String) -> String {
        let token = format!("{TOKEN_PREFIX}{}", Uuid::new_v4().simple());
        self.lock().push((token.clone(), html));
        token
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Substitute every token present in `html`, paragraph-wrapped
    /// occurrences first. Substituted entries leave the scratch. Tokens
    /// brought in by a substituted fragment (nested includes) are resolved
    /// in the same call.
    pub fn resolve(&self, html: &str) -> String {
        let mut html = html.to_string();
        let mut entries = self.lock();
        loop {
            let pending = entries.len();
            entries.retain(|(token, fragment)| {
                if !html.contains(token.as_str()) {
                    return true;
                }
                html = html.replace(&format!("<p>{token}</p>"), fragment);
                html = html.replace(token.as_str(), fragment);
                false
            });
            if entries.len() == pending {
                break;
            }
        }
        html
    }

    /// Resolve the final page and consume the scratch.
    ///
    /// Entries whose token no longer appears were mangled by the markup
    /// stage; they and any leftover token text are reported.
    pub fn finish(self, html: String) -> String {
        let html = self.resolve(&html);

        for (token, _) in self.lock().iter() {
            warn!(token = %token, "include token lost during rendering, content dropped");
        }
        if html.contains(TOKEN_PREFIX) {
            warn!("unresolved include token left in page output");
        }

        html
    }
}

/// The `include_raw` template function, bound to one page's scratch.
pub(crate) struct IncludeRaw {
    root: PathBuf,
    templates: Arc<Tera>,
    scratch: IncludeScratch,
    depth: usize,
}

impl IncludeRaw {
    pub(crate) fn new(root: PathBuf, templates: Arc<Tera>, scratch: IncludeScratch) -> Self {
        Self {
            root,
            templates,
            scratch,
            depth: 0,
        }
    }

    /// The same function one include level down, for fragments that
    /// include other fragments.
    fn nested(&self) -> Self {
        Self {
            root: self.root.clone(),
            templates: Arc::clone(&self.templates),
            scratch: self.scratch.clone(),
            depth: self.depth + 1,
        }
    }

    fn read(&self, file: &str) -> Option<String> {
        let path = sandboxed(&self.root, file)?;
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(file, error = %e, "failed to read include");
                None
            }
        }
    }

    fn render(&self, file: &str, content: String, data: Option<&Value>) -> String {
        if !(content.contains("{{") || content.contains("{%")) {
            return content;
        }

        let context = match data {
            Some(Value::Object(map)) => {
                Context::from_value(Value::Object(map.clone())).unwrap_or_default()
            }
            Some(Value::Null) | None => Context::new(),
            Some(other) => {
                let mut context = Context::new();
                context.insert("data", other);
                context
            }
        };

        let mut tera = (*self.templates).clone();
        tera.register_function("include_raw", self.nested());
        match tera.render_str(&content, &context) {
            Ok(html) => html,
            Err(e) => {
                warn!(
                    file,
                    error = %docsmith_parser::error_chain(&e),
                    "failed to render include, using it verbatim"
                );
                content
            }
        }
    }
}

impl tera::Function for IncludeRaw {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let file = args
            .get("file")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("include_raw requires a `file` string argument"))?;

        if self.depth >= MAX_INCLUDE_DEPTH {
            warn!(file, depth = self.depth, "includes nested too deeply, ignoring");
            return Ok(Value::String(String::new()));
        }

        let Some(content) = self.read(file) else {
            return Ok(Value::String(String::new()));
        };
        let html = self.render(file, content, args.get("data"));
        debug!(file, "parked raw include");
        Ok(Value::String(self.scratch.insert(html)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Resolve `file` under `root`, refusing anything that lands outside it.
fn sandboxed(root: &Path, file: &str) -> Option<PathBuf> {
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "includes directory is not readable");
            return None;
        }
    };
    let path = match root.join(file).canonicalize() {
        Ok(path) => path,
        Err(e) => {
            warn!(file, error = %e, "include not found");
            return None;
        }
    };

    if path.starts_with(&root) && path.is_file() {
        Some(path)
    } else {
        warn!(file, "include resolves outside the includes directory, ignoring");
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn include_fn(root: &Path, scratch: &IncludeScratch) -> IncludeRaw {
        IncludeRaw::new(root.to_path_buf(), Arc::new(Tera::default()), scratch.clone())
    }

    fn call(f: &IncludeRaw, args: Value) -> String {
        let args: HashMap<String, Value> = serde_json::from_value(args).unwrap();
        tera::Function::call(f, &args).unwrap().as_str().unwrap().to_string()
    }

    #[test]
    fn test_token_format() {
        let scratch = IncludeScratch::new();
        let token = scratch.insert("<b>x</b>".to_string());
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + 32);
        assert_ne!(token, scratch.insert("<b>x</b>".to_string()));
    }

    #[test]
    fn test_finish_prefers_paragraph_wrapped() {
        let scratch = IncludeScratch::new();
        let token = scratch.insert("<div>raw</div>".to_string());
        let html = format!("<main><p>{token}</p><span>{token}</span></main>");

        let out = scratch.finish(html);
        assert_eq!(out, "<main><div>raw</div><span><div>raw</div></span></main>");
    }

    #[test]
    fn test_finish_consumes_scratch() {
        let scratch = IncludeScratch::new();
        let handle = scratch.clone();
        let token = scratch.insert("x".to_string());
        assert_eq!(handle.len(), 1);

        let out = scratch.finish(format!("<p>{token}</p>"));
        assert_eq!(out, "x");
        assert!(handle.is_empty());
    }

    #[test]
    fn test_resolve_keeps_unmatched_entries() {
        let scratch = IncludeScratch::new();
        let body = scratch.insert("body".to_string());
        let layout = scratch.insert("layout".to_string());

        assert_eq!(scratch.resolve(&format!("<p>{body}</p>")), "body");
        assert_eq!(scratch.len(), 1);
        assert_eq!(scratch.finish(format!("[{layout}]")), "[layout]");
    }

    #[test]
    fn test_include_reads_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("widget.html"), "<div id=\"w\">*not markdown*</div>").unwrap();

        let scratch = IncludeScratch::new();
        let f = include_fn(dir.path(), &scratch);
        let token = call(&f, json!({ "file": "widget.html" }));

        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(
            scratch.finish(format!("<p>{token}</p>")),
            "<div id=\"w\">*not markdown*</div>"
        );
    }

    #[test]
    fn test_include_renders_with_data() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hello.html"), "<p>Hello {{ name }}</p>").unwrap();

        let scratch = IncludeScratch::new();
        let f = include_fn(dir.path(), &scratch);
        let token = call(&f, json!({ "file": "hello.html", "data": { "name": "Ada" } }));

        assert_eq!(scratch.finish(token), "<p>Hello Ada</p>");
    }

    #[test]
    fn test_nested_include() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("card.html"),
            "<div class=\"card\">{{ include_raw(file=\"icon.html\", data=data) }}</div>",
        )
        .unwrap();
        fs::write(dir.path().join("icon.html"), "<i>{{ data }}</i>").unwrap();

        let scratch = IncludeScratch::new();
        let f = include_fn(dir.path(), &scratch);
        let token = call(&f, json!({ "file": "card.html", "data": "star" }));

        let out = scratch.resolve(&format!("<p>{token}</p>"));
        assert_eq!(out, "<div class=\"card\"><i>star</i></div>");
        assert!(scratch.is_empty());
    }

    #[test]
    fn test_self_include_stops() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("loop.html"),
            "[{{ include_raw(file=\"loop.html\") }}]",
        )
        .unwrap();

        let scratch = IncludeScratch::new();
        let f = include_fn(dir.path(), &scratch);
        let token = call(&f, json!({ "file": "loop.html" }));

        let out = scratch.finish(token);
        assert_eq!(out, "[".repeat(MAX_INCLUDE_DEPTH) + &"]".repeat(MAX_INCLUDE_DEPTH));
        assert!(!out.contains(TOKEN_PREFIX));
    }

    #[test]
    fn test_include_outside_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("includes");
        fs::create_dir_all(&root).unwrap();
        fs::write(dir.path().join("secret.html"), "secret").unwrap();

        let scratch = IncludeScratch::new();
        let f = include_fn(&root, &scratch);
        assert_eq!(call(&f, json!({ "file": "../secret.html" })), "");
        assert!(scratch.is_empty());
    }

    #[test]
    fn test_missing_include_is_empty() {
        let dir = TempDir::new().unwrap();
        let scratch = IncludeScratch::new();
        let f = include_fn(dir.path(), &scratch);
        assert_eq!(call(&f, json!({ "file": "nope.html" })), "");
    }

    #[test]
    fn test_include_requires_file() {
        let dir = TempDir::new().unwrap();
        let f = include_fn(dir.path(), &IncludeScratch::new());
        let args = HashMap::new();
        assert!(tera::Function::call(&f, &args).is_err());
    }
}
