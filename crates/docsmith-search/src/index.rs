//! In-memory inverted index serialized to JSON for the browser.
//!
//! Every stored record is keyed by the originating document id, so a hit
//! resolves to exactly one display record.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Index format version.
pub const INDEX_VERSION: u32 = 1;

/// Fields fed to the index for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    /// Resolved title.
    pub title: String,

    /// Raw body markup, not rendered HTML.
    pub content: String,

    /// Site path of the document.
    pub path: String,
}

/// Term sets stored per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFields {
    pub path: String,
    pub title: Vec<String>,
    pub content: Vec<String>,
}

/// Inverted index: term to sorted document ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    /// Index format version.
    pub version: u32,

    /// Stored term sets, keyed by document id.
    pub documents: BTreeMap<u32, StoredFields>,

    /// Term to ids of the documents containing it.
    pub index: BTreeMap<String, Vec<u32>>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            version: INDEX_VERSION,
            documents: BTreeMap::new(),
            index: BTreeMap::new(),
        }
    }

    /// Add one document. Adding the same id twice replaces its postings.
    pub fn add(&mut self, id: u32, entry: &SearchIndexEntry) {
        if self.documents.contains_key(&id) {
            self.remove(id);
        }

        let title = unique_terms(&entry.title);
        let content = unique_terms(&entry.content);
        let path = path_terms(&entry.path);

        let all: BTreeSet<&String> = title.iter().chain(&content).chain(&path).collect();
        for term in all {
            let postings = self.index.entry(term.clone()).or_default();
            if let Err(pos) = postings.binary_search(&id) {
                postings.insert(pos, id);
            }
        }

        self.documents.insert(
            id,
            StoredFields {
                path: entry.path.clone(),
                title,
                content,
            },
        );
    }

    fn remove(&mut self, id: u32) {
        self.documents.remove(&id);
        self.index.retain(|_, postings| {
            postings.retain(|&p| p != id);
            !postings.is_empty()
        });
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether a document id is indexed.
    #[cfg(test)]
    pub(crate) fn contains(&self, id: u32) -> bool {
        self.documents.contains_key(&id)
    }

    /// Ids of documents matching all query terms (AND search), ascending.
    pub fn search(&self, query: &str) -> Vec<u32> {
        let query_terms = tokenize_text(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut result: Option<Vec<u32>> = None;
        for term in &query_terms {
            let Some(postings) = self.index.get(term) else {
                return Vec::new();
            };
            result = Some(match result {
                None => postings.clone(),
                Some(mut ids) => {
                    ids.retain(|id| postings.binary_search(id).is_ok());
                    ids
                }
            });
        }

        result.unwrap_or_default()
    }

    /// Serialize the index to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize an index from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn unique_terms(text: &str) -> Vec<String> {
    let mut terms = tokenize_text(text);
    terms.sort();
    terms.dedup();
    terms
}

fn path_terms(path: &str) -> Vec<String> {
    let trimmed = path.trim_start_matches('/');
    let stem = trimmed.strip_suffix(".html").unwrap_or(trimmed);
    unique_terms(stem)
}

/// Tokenize text into normalized terms.
///
/// Words of two or more characters are lower-cased; CJK text contributes
/// single characters and bigrams.
pub fn tokenize_text(text: &str) -> Vec<String> {
    let mut terms = Vec::new();

    for word in text.split(|c: char| !c.is_alphanumeric() || is_cjk_char(c)) {
        if word.chars().count() >= 2 {
            terms.push(word.to_lowercase());
        }
    }

    let cjk: Vec<char> = text.chars().filter(|c| is_cjk_char(*c)).collect();
    if !cjk.is_empty() {
        terms.extend(cjk.iter().map(char::to_string));
        terms.extend(cjk.windows(2).map(|pair| pair.iter().collect::<String>()));
    }

    terms
}

/// Check if a character is a CJK (Chinese, Japanese, Korean) character.
fn is_cjk_char(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |
        '\u{3400}'..='\u{4DBF}' |
        '\u{20000}'..='\u{2A6DF}' |
        '\u{F900}'..='\u{FAFF}' |
        '\u{3040}'..='\u{309F}' |      // Hiragana
        '\u{30A0}'..='\u{30FF}' |      // Katakana
        '\u{AC00}'..='\u{D7AF}'        // Hangul
    )
}
