//! Markdown parser using pulldown-cmark.

use std::{path::Path, sync::LazyLock};

use docsmith_core::{
    Document, Metadata, TocEntry, derive_page_path, frontmatter::parse_frontmatter,
};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use serde_json::Value;

use crate::{ParserError, Result, escape_html, syntax::SyntaxHighlighter, tabs};

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("valid non-word pattern"));

/// Compiles a document body as a template before markup rendering.
///
/// Only consulted for documents whose metadata sets `template: true`.
pub trait BodyTemplater {
    /// Render `body` with the inline-rendered metadata as context.
    fn render_body(&self, body: &str, context: &Metadata) -> std::result::Result<String, tera::Error>;
}

/// Standalone templater: plain Tera without site helpers.
#[derive(Debug, Default, Clone, Copy)]
pub struct OneOffTemplater;

impl BodyTemplater for OneOffTemplater {
    fn render_body(&self, body: &str, context: &Metadata) -> std::result::Result<String, tera::Error> {
        let context = tera::Context::from_serialize(context)?;
        tera::Tera::one_off(body, &context, false)
    }
}

/// Output of parsing one source file, before identifiers are assigned.
#[derive(Debug, Clone)]
pub struct ParsedContent {
    /// Decoded metadata, string values not yet inline-rendered.
    pub metadata: Metadata,

    /// Body with the metadata block stripped.
    pub body_markup: String,

    /// Rendered body.
    pub body_html: String,

    /// Table of contents extracted from headings.
    pub toc: Vec<TocEntry>,
}

impl ParsedContent {
    /// Turn parsed content into a [`Document`] at the path derived from
    /// `source` (relative to the content root).
    pub fn into_document(self, id: u32, source: &Path) -> Document {
        Document {
            id,
            path: derive_page_path(source),
            source: source.to_path_buf(),
            metadata: self.metadata,
            body_markup: self.body_markup,
            body_html: self.body_html,
            toc: self.toc,
        }
    }
}

/// Markdown parser with syntax highlighting support.
#[derive(Debug)]
pub struct MarkdownParser {
    highlighter: SyntaxHighlighter,
    options: Options,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a new markdown parser with default options.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self {
            highlighter: SyntaxHighlighter::default(),
            options,
        }
    }

    /// Create a parser with a custom syntax theme.
    pub fn with_theme(theme: &str) -> Self {
        let mut parser = Self::new();
        parser.highlighter.set_theme(theme);
        parser
    }

    /// Split the metadata block from the body.
    ///
    /// A malformed block is fatal: the error is returned, never skipped.
    pub fn split(&self, raw: &str, source: &Path) -> Result<(Metadata, String)> {
        Ok(parse_frontmatter(raw, source)?)
    }

    /// Parse a source document, compiling template bodies with plain Tera.
    pub fn parse(&self, raw: &str, source: &Path) -> Result<ParsedContent> {
        self.parse_with(raw, source, &OneOffTemplater)
    }

    /// Parse a source document with a caller-supplied body templater.
    pub fn parse_with(
        &self,
        raw: &str,
        source: &Path,
        templater: &dyn BodyTemplater,
    ) -> Result<ParsedContent> {
        let (metadata, body_markup) = self.split(raw, source)?;
        let (body_html, toc) = self.render_body(&metadata, &body_markup, source, templater)?;

        Ok(ParsedContent {
            metadata,
            body_markup,
            body_html,
            toc,
        })
    }

    /// Render a body, running it through `templater` first when the metadata
    /// marks it as a template.
    pub fn render_body(
        &self,
        metadata: &Metadata,
        body: &str,
        source: &Path,
        templater: &dyn BodyTemplater,
    ) -> Result<(String, Vec<TocEntry>)> {
        if !metadata.is_template() {
            return Ok(self.render_markdown(body));
        }

        let context = self.render_metadata(metadata);
        let expanded = templater
            .render_body(body, &context)
            .map_err(|e| ParserError::template(source, &e))?;
        tracing::debug!(source = %source.display(), "rendered body template");

        Ok(self.render_markdown(&expanded))
    }

    /// Render markdown to HTML with TOC extraction.
    pub fn render_markdown(&self, content: &str) -> (String, Vec<TocEntry>) {
        let expanded = tabs::expand_tabs(content, &|body| self.render_markdown(body).0);
        let (html, toc) = self.render_events(&expanded.source);
        (expanded.restore(html), toc)
    }

    /// Render a short piece of markup, dropping the paragraph it would be
    /// wrapped in.
    pub fn render_inline(&self, text: &str) -> String {
        let (html, _) = self.render_markdown(text);
        unwrap_single_paragraph(&html)
    }

    /// Inline-render every string value; other values are kept as they are.
    pub fn render_metadata(&self, metadata: &Metadata) -> Metadata {
        Metadata::from_map(
            metadata
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => Value::String(self.render_inline(s)),
                        other => other.clone(),
                    };
                    (key.clone(), value)
                })
                .collect(),
        )
    }

    fn render_events(&self, content: &str) -> (String, Vec<TocEntry>) {
        let parser = Parser::new_ext(content, self.options);
        let mut toc = Vec::new();
        let mut events: Vec<Event<'_>> = Vec::new();
        let mut heading: Option<HeadingState<'_>> = None;
        let mut image: Option<ImageState> = None;
        let mut code: Option<CodeState> = None;

        for event in parser {
            // Image alt text arrives as nested events.
            if let Some(state) = image.as_mut() {
                match event {
                    Event::End(TagEnd::Image) => {
                        let html = state.to_html();
                        image = None;
                        sink(&mut heading, &mut events).push(Event::InlineHtml(CowStr::from(html)));
                    }
                    Event::Text(text) | Event::Code(text) => state.alt.push_str(&text),
                    _ => {}
                }
                continue;
            }

            if let Some(state) = code.as_mut() {
                match event {
                    Event::End(TagEnd::CodeBlock) => {
                        let html = self.render_code_block(state);
                        code = None;
                        events.push(Event::Html(CowStr::from(html)));
                    }
                    Event::Text(text) => state.content.push_str(&text),
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::Heading {
                    level, id, classes, ..
                }) => {
                    heading = Some(HeadingState {
                        level: level as u8,
                        explicit_id: id.map(|i| i.to_string()),
                        classes: classes.iter().map(|c| c.to_string()).collect(),
                        text: String::new(),
                        inner: Vec::new(),
                    });
                }

                Event::End(TagEnd::Heading(_)) => {
                    if let Some(state) = heading.take() {
                        let (html, entry) = state.finish();
                        toc.push(entry);
                        events.push(Event::Html(CowStr::from(html)));
                    }
                }

                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    image = Some(ImageState {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                    });
                }

                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string)
                            .filter(|l| !l.is_empty()),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some(CodeState {
                        lang,
                        content: String::new(),
                    });
                }

                Event::Text(ref text) | Event::Code(ref text) => {
                    if let Some(state) = heading.as_mut() {
                        state.text.push_str(text);
                    }
                    sink(&mut heading, &mut events).push(event);
                }

                other => sink(&mut heading, &mut events).push(other),
            }
        }

        let mut html_out = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut html_out, events.into_iter());
        (html_out, toc)
    }

    fn render_code_block(&self, state: &CodeState) -> String {
        if let Some(lang) = state.lang.as_deref() {
            if let Some(highlighted) = self.highlighter.highlight(&state.content, lang) {
                return highlighted;
            }
            tracing::debug!(lang, "no highlighting for language, rendering plain code");
            return format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                escape_html(lang),
                escape_html(&state.content)
            );
        }
        format!("<pre><code>{}</code></pre>\n", escape_html(&state.content))
    }
}

/// Where events go: into the open heading, or the document.
fn sink<'s, 'a>(
    heading: &'s mut Option<HeadingState<'a>>,
    events: &'s mut Vec<Event<'a>>,
) -> &'s mut Vec<Event<'a>> {
    match heading {
        Some(state) => &mut state.inner,
        None => events,
    }
}

struct HeadingState<'a> {
    level: u8,
    explicit_id: Option<String>,
    classes: Vec<String>,
    text: String,
    inner: Vec<Event<'a>>,
}

impl HeadingState<'_> {
    fn finish(self) -> (String, TocEntry) {
        let slug = self.explicit_id.unwrap_or_else(|| slugify(&self.text));
        let mut inner = String::new();
        html::push_html(&mut inner, self.inner.into_iter());

        let class_attr = if self.classes.is_empty() {
            String::new()
        } else {
            format!(" class=\"{}\"", escape_html(&self.classes.join(" ")))
        };
        let level = self.level;
        let id = escape_html(&slug);
        let html = format!(
            "<h{level} id=\"{id}\"{class_attr}><a class=\"heading-anchor\" href=\"#{id}\">{inner}</a></h{level}>\n"
        );

        let entry = TocEntry {
            level,
            text: self.text,
            id: slug,
        };
        (html, entry)
    }
}

struct ImageState {
    src: String,
    title: String,
    alt: String,
}

impl ImageState {
    fn to_html(&self) -> String {
        let title_attr = if self.title.is_empty() {
            String::new()
        } else {
            format!(" title=\"{}\"", escape_html(&self.title))
        };
        format!(
            "<img src=\"{}\" alt=\"{}\" class=\"img-fluid\"{title_attr} />",
            escape_html(&self.src),
            escape_html(&self.alt)
        )
    }
}

struct CodeState {
    lang: Option<String>,
    content: String,
}

/// Strip the enclosing `<p>` when the HTML is exactly one paragraph.
pub fn unwrap_single_paragraph(html: &str) -> String {
    let trimmed = html.trim();
    if let Some(inner) = trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
    {
        if !inner.contains("<p>") && !inner.contains("</p>") {
            return inner.to_string();
        }
    }
    html.to_string()
}

/// Heading anchor slug: lower-cased, non-word runs become `-`, trailing
/// hyphens dropped.
pub fn slugify(text: &str) -> String {
    NON_WORD
        .replace_all(&text.to_lowercase(), "-")
        .trim_end_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_markdown() {
        let parser = MarkdownParser::new();
        let content = r#"---
title: "Test Post"
---

# Hello World

This is a test."#;

        let result = parser.parse(content, Path::new("test.md")).unwrap();

        assert_eq!(result.metadata.title(), Some("Test Post"));
        assert!(result.body_html.contains("<h1 id=\"hello-world\">"));
        assert!(result.body_html.contains("<p>This is a test.</p>"));
        assert_eq!(result.body_markup, "# Hello World\n\nThis is a test.");
    }

    #[test]
    fn test_heading_anchor() {
        let parser = MarkdownParser::new();
        let (html, toc) = parser.render_markdown("## Getting *Started*!");

        assert_eq!(
            html.trim(),
            "<h2 id=\"getting-started\"><a class=\"heading-anchor\" href=\"#getting-started\">Getting <em>Started</em>!</a></h2>"
        );
        assert_eq!(toc[0].id, "getting-started");
        assert_eq!(toc[0].text, "Getting Started!");
    }

    #[test]
    fn test_heading_explicit_id() {
        let parser = MarkdownParser::new();
        let (html, toc) = parser.render_markdown("# Install {#setup}");
        assert!(html.contains("id=\"setup\""));
        assert_eq!(toc[0].id, "setup");
    }

    #[test]
    fn test_toc_extraction() {
        let parser = MarkdownParser::new();
        let (_, toc) = parser.render_markdown("# Heading 1\n## Heading 2\n### Heading 3");

        assert_eq!(toc.len(), 3);
        assert_eq!(toc[0].level, 1);
        assert_eq!(toc[0].text, "Heading 1");
        assert_eq!(toc[1].level, 2);
        assert_eq!(toc[2].level, 3);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test 123 Post"), "test-123-post");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("What's new?"), "what-s-new");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_image_rendering() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render_markdown("![A *cat*](cat.png)");
        assert!(html.contains("<img src=\"cat.png\" alt=\"A cat\" class=\"img-fluid\" />"));
        assert!(!html.contains("title="));

        let (html, _) = parser.render_markdown("![Dog](dog.png \"Good dog\")");
        assert!(html.contains("class=\"img-fluid\" title=\"Good dog\""));
    }

    #[test]
    fn test_parse_code_block() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render_markdown("```rust\nfn main() {}\n```");

        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_unknown_language_is_escaped() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render_markdown("```nosuchlang\n<b>&</b>\n```");
        assert!(html.contains("<pre><code class=\"language-nosuchlang\">&lt;b&gt;&amp;&lt;/b&gt;\n</code></pre>"));
    }

    #[test]
    fn test_plain_code_block() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render_markdown("    indented <code>");
        assert!(html.contains("<pre><code>indented &lt;code&gt;\n</code></pre>"));
    }

    #[test]
    fn test_table_rendering() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render_markdown(
            r#"| Header 1 | Header 2 |
|----------|----------|
| Cell 1   | Cell 2   |"#,
        );

        assert!(html.contains("<table>"));
        assert!(html.contains("<thead>"));
        assert!(html.contains("<td>Cell 1</td>"));
    }

    #[test]
    fn test_task_list() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render_markdown("- [x] Done\n- [ ] Not done");

        assert!(html.contains("checkbox"));
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_tabs_render_nested_markdown() {
        let parser = MarkdownParser::new();
        let (html, _) = parser.render_markdown(
            "::: tabs\n::: tab Cargo\n**cargo** install\n::: tab Git\n`git clone`\n:::\n",
        );
        assert!(html.contains("<div class=\"tab-group\">"));
        assert!(html.contains("<strong>cargo</strong> install"));
        assert!(html.contains("<code>git clone</code>"));
        assert!(!html.contains("docsmith-tabs:"));
    }

    #[test]
    fn test_no_frontmatter() {
        let parser = MarkdownParser::new();
        let content = "# Just Content\n\nNo frontmatter here.";
        let result = parser.parse(content, Path::new("test.md")).unwrap();

        assert!(result.metadata.is_empty());
        assert!(result.body_html.contains("Just Content"));
    }

    #[test]
    fn test_malformed_frontmatter_is_fatal() {
        let parser = MarkdownParser::new();
        let result = parser.parse("---\ntitle: [oops\n---\nbody", Path::new("bad.md"));
        assert!(matches!(result, Err(ParserError::Core(_))));
    }

    #[test]
    fn test_template_body() {
        let parser = MarkdownParser::new();
        let content = "---\ntemplate: true\nproduct: \"*Docsmith*\"\n---\n\nWelcome to {{ product }}.";
        let result = parser.parse(content, Path::new("welcome.md")).unwrap();
        assert!(result.body_html.contains("<p>Welcome to <em>Docsmith</em>.</p>"));
        assert!(result.body_markup.contains("{{ product }}"));
    }

    #[test]
    fn test_non_template_body_is_left_alone() {
        let parser = MarkdownParser::new();
        let result = parser
            .parse("---\nproduct: X\n---\n{{ product }}", Path::new("a.md"))
            .unwrap();
        assert!(result.body_html.contains("{{ product }}"));
    }

    #[test]
    fn test_template_error() {
        let parser = MarkdownParser::new();
        let result = parser.parse("---\ntemplate: true\n---\n{% if %}", Path::new("broken.md"));
        let err = result.unwrap_err();
        assert!(matches!(err, ParserError::Template { .. }));
        assert!(err.to_string().contains("broken.md"));
    }

    #[test]
    fn test_render_metadata() {
        let parser = MarkdownParser::new();
        let mut meta = Metadata::default();
        meta.insert("title", Value::String("Using **bold**".to_string()));
        meta.insert("order", Value::from(2));

        let rendered = parser.render_metadata(&meta);
        assert_eq!(rendered.get_str("title"), Some("Using <strong>bold</strong>"));
        assert_eq!(rendered.get("order"), Some(&Value::from(2)));
    }

    #[test]
    fn test_unwrap_single_paragraph() {
        assert_eq!(unwrap_single_paragraph("<p>Hello</p>\n"), "Hello");
        assert_eq!(
            unwrap_single_paragraph("<p>One</p>\n<p>Two</p>\n"),
            "<p>One</p>\n<p>Two</p>\n"
        );
        assert_eq!(unwrap_single_paragraph("<ul><li>x</li></ul>"), "<ul><li>x</li></ul>");
    }

    #[test]
    fn test_into_document() {
        let parser = MarkdownParser::new();
        let parsed = parser.parse("# Setup", Path::new("guides/setup.md")).unwrap();
        let doc = parsed.into_document(7, Path::new("guides/setup.md"));
        assert_eq!(doc.id, 7);
        assert_eq!(doc.path, "/guides/setup.html");
    }
}
