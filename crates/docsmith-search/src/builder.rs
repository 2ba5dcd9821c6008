//! Search bundle construction: index, display records and cache metadata.

use std::{collections::BTreeMap, fs, path::Path};

use chrono::Utc;
use docsmith_core::{Document, Navigation, TocEntry};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{
    Result,
    index::{SearchIndex, SearchIndexEntry},
};

/// File names written next to the site.
pub const INDEX_FILE: &str = "search-index.json";
pub const DOCUMENTS_FILE: &str = "search-documents.json";
pub const META_FILE: &str = "search-meta.json";

/// Default preview budget, in characters.
pub const DEFAULT_PREVIEW_LENGTH: usize = 300;

/// Tags whose boundaries separate words in a preview.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "hr", "li", "ul", "ol", "dl", "dt", "dd", "h1", "h2", "h3", "h4", "h5",
    "h6", "pre", "blockquote", "table", "thead", "tbody", "tr", "td", "th", "details",
    "summary", "section", "figure", "figcaption",
];

/// What a search hit shows without reparsing the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub title: String,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: String,
}

/// Cache-invalidation data for the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMeta {
    /// RFC 3339 build timestamp.
    pub build_time: String,

    /// SHA-256 hex digest of the serialized index.
    pub index_hash: String,

    /// SHA-256 hex digest of the serialized display records.
    pub documents_hash: String,

    /// Number of indexed documents.
    pub document_count: usize,
}

/// Index plus display records, both keyed by document id.
#[derive(Debug, Clone, Default)]
pub struct SearchBundle {
    pub index: SearchIndex,
    pub records: BTreeMap<u32, DisplayRecord>,
}

impl SearchBundle {
    /// Display records for the ids matching `query`.
    pub fn search(&self, query: &str) -> Vec<&DisplayRecord> {
        self.index
            .search(query)
            .into_iter()
            .filter_map(|id| self.records.get(&id))
            .collect()
    }

    pub fn index_json(&self) -> Result<String> {
        self.index.to_json()
    }

    pub fn records_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.records)?)
    }

    /// Hashes and counts for the current contents.
    pub fn meta(&self) -> Result<SearchMeta> {
        Ok(self.meta_for(&self.index_json()?, &self.records_json()?))
    }

    fn meta_for(&self, index_json: &str, records_json: &str) -> SearchMeta {
        SearchMeta {
            build_time: Utc::now().to_rfc3339(),
            index_hash: sha256_hex(index_json.as_bytes()),
            documents_hash: sha256_hex(records_json.as_bytes()),
            document_count: self.records.len(),
        }
    }

    /// Write the index, the records and the metadata file into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<SearchMeta> {
        fs::create_dir_all(dir)?;

        let index_json = self.index_json()?;
        let records_json = self.records_json()?;
        let meta = self.meta_for(&index_json, &records_json);

        fs::write(dir.join(INDEX_FILE), index_json)?;
        fs::write(dir.join(DOCUMENTS_FILE), records_json)?;
        fs::write(dir.join(META_FILE), serde_json::to_string_pretty(&meta)?)?;

        info!(
            documents = meta.document_count,
            terms = self.index.index.len(),
            "wrote search index"
        );
        Ok(meta)
    }
}

/// Builds a [`SearchBundle`] from the document collection.
#[derive(Debug, Clone)]
pub struct SearchIndexBuilder {
    preview_length: usize,
}

impl Default for SearchIndexBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_LENGTH)
    }
}

impl SearchIndexBuilder {
    pub fn new(preview_length: usize) -> Self {
        Self { preview_length }
    }

    /// Index every document that is not excluded by its metadata or by the
    /// first navigation entry referencing it.
    pub fn build(&self, documents: &[Document], navigation: &Navigation) -> SearchBundle {
        let mut bundle = SearchBundle::default();

        for doc in documents {
            if is_excluded(doc, navigation) {
                debug!(path = %doc.path, "excluded from search");
                continue;
            }

            let title = resolve_title(doc);
            bundle.index.add(
                doc.id,
                &SearchIndexEntry {
                    title: title.clone(),
                    content: doc.body_markup.clone(),
                    path: doc.path.clone(),
                },
            );
            bundle.records.insert(
                doc.id,
                DisplayRecord {
                    title,
                    preview: self.preview(doc),
                    description: doc.metadata.description().map(str::to_string),
                    path: doc.path.clone(),
                },
            );
        }

        bundle
    }

    fn preview(&self, doc: &Document) -> String {
        let text = if doc.body_html.is_empty() {
            doc.body_markup.clone()
        } else {
            strip_html(&doc.body_html)
        };
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_at_word_boundary(&collapsed, self.preview_length)
    }
}

/// Metadata flag, or the flag of the first navigation entry for the page.
pub fn is_excluded(doc: &Document, navigation: &Navigation) -> bool {
    doc.metadata.is_excluded_from_search() || navigation.excludes_from_search(&doc.path)
}

/// Title used for search: metadata title, first level-one heading,
/// file name, then `Home`.
pub fn resolve_title(doc: &Document) -> String {
    resolve_title_with(doc, &doc.toc)
}

/// [`resolve_title`] with the table of contents of a render that has not
/// been stored on the document yet. An empty `toc` falls back to a heading
/// pass over the raw markup.
pub fn resolve_title_with(doc: &Document, toc: &[TocEntry]) -> String {
    if let Some(title) = doc.metadata.title() {
        return title.trim().to_string();
    }

    let heading = if toc.is_empty() {
        first_heading(&doc.body_markup)
    } else {
        toc.iter()
            .find(|entry| entry.level == 1)
            .map(|entry| entry.text.trim().to_string())
    };
    if let Some(heading) = heading.filter(|h| !h.is_empty()) {
        return heading;
    }

    title_from_path(&doc.path).unwrap_or_else(|| "Home".to_string())
}

/// Plain text of the first level-one heading, ATX or setext. Code blocks
/// are not headings.
fn first_heading(markup: &str) -> Option<String> {
    let mut text: Option<String> = None;

    for event in Parser::new_ext(markup, Options::ENABLE_HEADING_ATTRIBUTES) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => text = Some(String::new()),
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                if let Some(heading) = text.take() {
                    let heading = heading.trim();
                    if !heading.is_empty() {
                        return Some(heading.to_string());
                    }
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(heading) = text.as_mut() {
                    heading.push_str(&t);
                }
            }
            _ => {}
        }
    }

    None
}

/// `/guides/getting-started.html` gives `Getting Started`; an `index` page
/// takes its directory name, the site root gives nothing.
fn title_from_path(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    let stem = trimmed.strip_suffix(".html").unwrap_or(trimmed);
    let mut segments: Vec<&str> = stem.split('/').filter(|s| !s.is_empty()).collect();
    if segments.last() == Some(&"index") {
        segments.pop();
    }
    let name = segments.last()?;

    let title = name
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    (!title.is_empty()).then_some(title)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Strip HTML tags from content. Block boundaries become spaces, inline
/// tags vanish, and the basic entities are decoded.
fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut tag = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                if is_block_tag(&tag) {
                    result.push(' ');
                }
            }
            _ if in_tag => tag.push(c),
            _ => result.push(c),
        }
    }

    decode_entities(&result)
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Truncate text at word boundary, respecting UTF-8 character boundaries.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncate_byte_idx = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let truncated = &text[..truncate_byte_idx];

    match truncated.rfind(' ') {
        Some(last_space) if last_space > 0 => format!("{}...", &truncated[..last_space]),
        _ => format!("{truncated}..."),
    }
}
