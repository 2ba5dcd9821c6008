//! Metadata block parsing for source documents.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Arbitrary string-keyed metadata decoded from a document's header block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Wrap an existing map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value lookup; non-string values yield `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Page title, if set and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.get_str("title").filter(|t| !t.trim().is_empty())
    }

    /// Page description, if set.
    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    /// Layout kind used to render the page.
    pub fn layout(&self) -> &str {
        self.get_str("layout").unwrap_or("page")
    }

    /// Whether the body must be compiled as a template before markup rendering.
    pub fn is_template(&self) -> bool {
        self.get("template").and_then(Value::as_bool).unwrap_or(false)
    }

    /// `excludeFromSearch: true` or `searchable: false`.
    pub fn is_excluded_from_search(&self) -> bool {
        let excluded = self
            .get("excludeFromSearch")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let searchable = self
            .get("searchable")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        excluded || !searchable
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Delimiter types for metadata blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML block delimited by `---`.
    Yaml,
    /// TOML block delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        match line.trim_end() {
            "---" => Some(Self::Yaml),
            "+++" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Split content into metadata payload and body.
///
/// The very first line must be a delimiter and a later line must repeat it
/// exactly; otherwise the whole input is body.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let first_end = content.find('\n')?;
    let format = FrontmatterFormat::from_line(&content[..first_end])?;
    let delimiter = format.delimiter();

    let payload_start = first_end + 1;
    let mut offset = payload_start;
    for line in content[payload_start..].split_inclusive('\n') {
        if line.trim_end() == delimiter {
            let payload = &content[payload_start..offset];
            let body = content[offset + line.len()..].trim_start_matches(['\r', '\n']);
            return Some((format, payload, body));
        }
        offset += line.len();
    }

    None
}

/// Parse the metadata block of a document.
///
/// Returns empty metadata and the untouched content when there is no block.
/// A block that does not decode to a mapping is a [`CoreError::Frontmatter`].
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(Metadata, String)> {
    let Some((format, payload, body)) = split_frontmatter(content) else {
        return Ok((Metadata::default(), content.to_string()));
    };

    let value = match format {
        FrontmatterFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(payload)
                .map_err(|e| CoreError::frontmatter(path, e.to_string()))?;
            serde_json::to_value(yaml).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
        FrontmatterFormat::Toml => {
            let table: toml::Table =
                toml::from_str(payload).map_err(|e| CoreError::frontmatter(path, e.to_string()))?;
            toml_to_json(toml::Value::Table(table))
        }
    };

    let map = match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(CoreError::frontmatter(
                path,
                format!("metadata must be a mapping, found {}", kind_of(&other)),
            ));
        }
    };

    Ok((Metadata(map), body.to_string()))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_yaml_frontmatter() {
        let content = r#"---
title: "Hello World"
date: 2024-01-14
---

This is the body content."#;

        let (format, fm, body) = split_frontmatter(content).expect("split");
        assert_eq!(format, FrontmatterFormat::Yaml);
        assert!(fm.contains("title:"));
        assert!(body.starts_with("This is the body"));
    }

    #[test]
    fn test_split_toml_frontmatter() {
        let content = r#"+++
title = "Hello World"
+++

This is the body content."#;

        let (format, fm, body) = split_frontmatter(content).expect("split");
        assert_eq!(format, FrontmatterFormat::Toml);
        assert!(fm.contains("title ="));
        assert!(body.starts_with("This is the body"));
    }

    #[test]
    fn test_no_frontmatter() {
        assert!(split_frontmatter("Just some content without frontmatter.").is_none());
    }

    #[test]
    fn test_delimiter_must_open_the_file() {
        let content = "\n---\ntitle: x\n---\nbody";
        assert!(split_frontmatter(content).is_none());
    }

    #[test]
    fn test_unclosed_block_is_body() {
        let content = "---\ntitle: x\nno closing line";
        assert!(split_frontmatter(content).is_none());

        let (meta, body) = parse_frontmatter(content, Path::new("a.md")).expect("parse");
        assert!(meta.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_horizontal_rule_inside_body_is_not_a_delimiter() {
        let content = "---\ntitle: x\n---\nabove\n\n---\n\nbelow";
        let (_, payload, body) = split_frontmatter(content).expect("split");
        assert_eq!(payload, "title: x\n");
        assert_eq!(body, "above\n\n---\n\nbelow");
    }

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: "Test Post"
searchable: false
order: 3
tags:
  - rust
  - test
---

Content here."#;

        let (meta, body) = parse_frontmatter(content, Path::new("test.md")).expect("parse");

        assert_eq!(meta.title(), Some("Test Post"));
        assert_eq!(meta.get("order"), Some(&Value::from(3)));
        assert_eq!(meta.get("tags").and_then(Value::as_array).map(Vec::len), Some(2));
        assert!(meta.is_excluded_from_search());
        assert_eq!(body, "Content here.");
    }

    #[test]
    fn test_parse_toml_frontmatter() {
        let content = r#"+++
title = "Test Post"
template = true
updated = 2024-01-14
+++

Content here."#;

        let (meta, body) = parse_frontmatter(content, Path::new("test.md")).expect("parse");

        assert_eq!(meta.title(), Some("Test Post"));
        assert!(meta.is_template());
        assert_eq!(meta.get_str("updated"), Some("2024-01-14"));
        assert_eq!(body, "Content here.");
    }

    #[test]
    fn test_non_mapping_payload_is_an_error() {
        let content = "---\n- one\n- two\n---\nbody";
        let err = parse_frontmatter(content, Path::new("list.md")).unwrap_err();
        assert!(err.to_string().contains("list.md"));
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let content = "---\ntitle: [unclosed\n---\nbody";
        let result = parse_frontmatter(content, Path::new("bad.md"));
        assert!(matches!(result, Err(CoreError::Frontmatter { .. })));
    }

    #[test]
    fn test_empty_block_is_empty_metadata() {
        let (meta, body) = parse_frontmatter("---\n---\nbody", Path::new("a.md")).expect("parse");
        assert!(meta.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_metadata_defaults() {
        let meta = Metadata::default();
        assert_eq!(meta.layout(), "page");
        assert!(!meta.is_template());
        assert!(!meta.is_excluded_from_search());
        assert!(meta.title().is_none());
    }

    #[test]
    fn test_exclusion_flags() {
        let mut meta = Metadata::default();
        meta.insert("excludeFromSearch", Value::Bool(true));
        assert!(meta.is_excluded_from_search());

        let mut meta = Metadata::default();
        meta.insert("searchable", Value::Bool(true));
        assert!(!meta.is_excluded_from_search());
    }
}
