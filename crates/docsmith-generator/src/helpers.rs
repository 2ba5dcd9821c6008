//! Template helpers registered on every template instance.
//!
//! | helper | kind |
//! |---|---|
//! | `eq(a, b, ci=false)` | function |
//! | `list`, `map` | tests |
//! | `alert(variant)` / `alert(body, variant)` | filter / function |
//! | `badge(text, variant="primary")` | function |
//! | `url_join(base, path)` | function |
//! | `search_box(variant, placeholder, width)` | function |
//!
//! `navigation` and `include_raw` need site or per-page state and are
//! registered by the engine.

use std::{collections::HashMap, sync::Arc};

use docsmith_core::config::join_url;
use docsmith_parser::{MarkdownParser, escape_html, unwrap_single_paragraph};
use tera::{Result, Tera, Value};

// SVG icons for alerts (GitHub Octicons-style, 16x16)
const SVG_INFO: &str = r#"<svg class="alert-icon" viewBox="0 0 16 16" width="16" height="16" aria-hidden="true"><path d="M0 8a8 8 0 1 1 16 0A8 8 0 0 1 0 8Zm8-6.5a6.5 6.5 0 1 0 0 13 6.5 6.5 0 0 0 0-13ZM6.5 7.75A.75.75 0 0 1 7.25 7h1a.75.75 0 0 1 .75.75v2.75h.25a.75.75 0 0 1 0 1.5h-2a.75.75 0 0 1 0-1.5h.25v-2h-.25a.75.75 0 0 1-.75-.75ZM8 6a1 1 0 1 1 0-2 1 1 0 0 1 0 2Z"></path></svg>"#;
const SVG_CHECK: &str = r#"<svg class="alert-icon" viewBox="0 0 16 16" width="16" height="16" aria-hidden="true"><path d="M0 8a8 8 0 1 1 16 0A8 8 0 0 1 0 8Zm1.5 0a6.5 6.5 0 1 0 13 0 6.5 6.5 0 0 0-13 0Zm10.28-1.72-4.5 4.5a.75.75 0 0 1-1.06 0l-2-2a.749.749 0 0 1 .326-1.275.749.749 0 0 1 .734.215l1.47 1.47 3.97-3.97a.749.749 0 0 1 1.275.326.749.749 0 0 1-.215.734Z"></path></svg>"#;
const SVG_ALERT: &str = r#"<svg class="alert-icon" viewBox="0 0 16 16" width="16" height="16" aria-hidden="true"><path d="M6.457 1.047c.659-1.234 2.427-1.234 3.086 0l6.082 11.378A1.75 1.75 0 0 1 14.082 15H1.918a1.75 1.75 0 0 1-1.543-2.575Zm1.763.707a.25.25 0 0 0-.44 0L1.698 13.132a.25.25 0 0 0 .22.368h12.164a.25.25 0 0 0 .22-.368Zm.53 3.996v2.5a.75.75 0 0 1-1.5 0v-2.5a.75.75 0 0 1 1.5 0ZM9 11a1 1 0 1 1-2 0 1 1 0 0 1 2 0Z"></path></svg>"#;
const SVG_STOP: &str = r#"<svg class="alert-icon" viewBox="0 0 16 16" width="16" height="16" aria-hidden="true"><path d="M4.47.22A.749.749 0 0 1 5 0h6c.199 0 .389.079.53.22l4.25 4.25c.141.14.22.331.22.53v6a.749.749 0 0 1-.22.53l-4.25 4.25A.749.749 0 0 1 11 16H5a.749.749 0 0 1-.53-.22L.22 11.53A.749.749 0 0 1 0 11V5c0-.199.079-.389.22-.53Zm.84 1.28L1.5 5.31v5.38l3.81 3.81h5.38l3.81-3.81V5.31L10.69 1.5ZM8 4a.75.75 0 0 1 .75.75v3.5a.75.75 0 0 1-1.5 0v-3.5A.75.75 0 0 1 8 4Zm0 8a1 1 0 1 1 0-2 1 1 0 0 1 0 2Z"></path></svg>"#;

/// Register the stateless helpers. `parser` renders alert bodies.
pub fn register(tera: &mut Tera, parser: Arc<MarkdownParser>) {
    tera.register_function("eq", eq);
    tera.register_function("badge", badge);
    tera.register_function("url_join", url_join);
    tera.register_function("search_box", search_box);
    tera.register_tester("list", is_list);
    tera.register_tester("map", is_map);

    let filter_parser = Arc::clone(&parser);
    tera.register_filter(
        "alert",
        move |value: &Value, args: &HashMap<String, Value>| {
            let body = value
                .as_str()
                .ok_or_else(|| tera::Error::msg("alert filter expects a string"))?;
            let variant = optional_str(args, "variant")?.unwrap_or("info");
            Ok(Value::String(alert_html(&filter_parser, body, variant)))
        },
    );
    tera.register_function("alert", move |args: &HashMap<String, Value>| {
        let body = required_str(args, "alert", "body")?;
        let variant = optional_str(args, "variant")?.unwrap_or("info");
        Ok(Value::String(alert_html(&parser, body, variant)))
    });
}

fn required_str<'a>(args: &'a HashMap<String, Value>, helper: &str, name: &str) -> Result<&'a str> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(tera::Error::msg(format!("{helper}: `{name}` must be a string"))),
        None => Err(tera::Error::msg(format!("{helper}: missing `{name}` argument"))),
    }
}

fn optional_str<'a>(args: &'a HashMap<String, Value>, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(tera::Error::msg(format!(
            "`{name}` must be a string, found {other}"
        ))),
    }
}

/// `eq(a, b, ci=false)`: structural equality, optionally ignoring case when
/// both sides are strings.
pub(crate) fn eq(args: &HashMap<String, Value>) -> Result<Value> {
    let a = args.get("a").unwrap_or(&Value::Null);
    let b = args.get("b").unwrap_or(&Value::Null);
    let ci = args.get("ci").and_then(Value::as_bool).unwrap_or(false);

    let equal = match (a, b) {
        (Value::String(a), Value::String(b)) if ci => a.to_lowercase() == b.to_lowercase(),
        _ => a == b,
    };
    Ok(Value::Bool(equal))
}

pub(crate) fn is_list(value: Option<&Value>, _args: &[Value]) -> Result<bool> {
    Ok(matches!(value, Some(Value::Array(_))))
}

pub(crate) fn is_map(value: Option<&Value>, _args: &[Value]) -> Result<bool> {
    Ok(matches!(value, Some(Value::Object(_))))
}

/// Alert box: icon, then the markdown-rendered body. A body that renders to
/// exactly one paragraph loses the paragraph.
pub fn alert_html(parser: &MarkdownParser, body: &str, variant: &str) -> String {
    let (class, icon) = match variant {
        "success" => ("success", SVG_CHECK),
        "warning" => ("warning", SVG_ALERT),
        "error" | "danger" => ("danger", SVG_STOP),
        _ => ("info", SVG_INFO),
    };
    let (html, _) = parser.render_markdown(body.trim());
    let content = unwrap_single_paragraph(&html);

    format!(
        r#"<div class="alert alert-{class}" role="alert">{icon}<div class="alert-content">{}</div></div>"#,
        content.trim_end()
    )
}

pub(crate) fn badge(args: &HashMap<String, Value>) -> Result<Value> {
    let text = match args.get("text") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(tera::Error::msg("badge: `text` must be a string")),
        None => return Err(tera::Error::msg("badge: missing `text` argument")),
    };
    let variant = optional_str(args, "variant")?.unwrap_or("primary");

    Ok(Value::String(format!(
        r#"<span class="badge text-bg-{}">{}</span>"#,
        escape_html(variant),
        escape_html(&text)
    )))
}

pub(crate) fn url_join(args: &HashMap<String, Value>) -> Result<Value> {
    let base = optional_str(args, "base")?.unwrap_or("/");
    let path = required_str(args, "url_join", "path")?;
    Ok(Value::String(join_url(base, path)))
}

/// Element ids and extra classes of each search widget placement.
fn search_variant(variant: &str) -> Option<(&'static str, &'static str, &'static str)> {
    match variant {
        "desktop" => Some(("search-input", "search-results", "d-none d-lg-block")),
        "mobile-navbar" => Some((
            "search-input-mobile-navbar",
            "search-results-mobile-navbar",
            "d-lg-none",
        )),
        "mobile-sidebar" => Some((
            "search-input-mobile-sidebar",
            "search-results-mobile-sidebar",
            "d-lg-none px-3 pb-3",
        )),
        _ => None,
    }
}

pub(crate) fn search_box(args: &HashMap<String, Value>) -> Result<Value> {
    let variant = optional_str(args, "variant")?.unwrap_or("desktop");
    let placeholder = optional_str(args, "placeholder")?.unwrap_or("Search...");
    let (input_id, results_id, classes) = search_variant(variant).ok_or_else(|| {
        tera::Error::msg(format!(
            "search_box: unknown variant `{variant}` (expected desktop, mobile-navbar or mobile-sidebar)"
        ))
    })?;
    let style = match args.get("width") {
        Some(Value::Number(n)) => format!(r#" style="width: {n}px""#),
        Some(Value::String(s)) if !s.is_empty() => {
            format!(r#" style="width: {}""#, escape_html(s))
        }
        _ => String::new(),
    };
    let placeholder = escape_html(placeholder);

    Ok(Value::String(format!(
        r#"<div class="search-box search-box-{variant} {classes}"{style}><input type="search" id="{input_id}" class="form-control search-input" placeholder="{placeholder}" aria-label="{placeholder}" autocomplete="off" data-results="{results_id}"><div id="{results_id}" class="search-results"></div></div>"#
    )))
}
