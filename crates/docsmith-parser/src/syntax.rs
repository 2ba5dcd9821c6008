//! Syntax highlighting for code blocks.

use syntect::{
    highlighting::{Theme, ThemeSet},
    html::highlighted_html_for_string,
    parsing::SyntaxSet,
};

/// Syntax highlighter using syntect.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    default_theme: String,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new("base16-ocean.dark")
    }
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the specified theme.
    pub fn new(theme: &str) -> Self {
        let highlighter = Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            default_theme: theme.to_string(),
        };
        if !highlighter.theme_set.themes.contains_key(theme) {
            tracing::warn!(theme, "unknown syntax theme, using the first available one");
        }
        highlighter
    }

    /// Get available theme names.
    #[cfg(test)]
    pub(crate) fn available_themes(&self) -> Vec<&str> {
        self.theme_set.themes.keys().map(|s| s.as_str()).collect()
    }

    /// Whether `lang` names a syntax this highlighter knows.
    #[cfg(test)]
    pub(crate) fn supports(&self, lang: &str) -> bool {
        self.syntax_set.find_syntax_by_token(lang).is_some()
    }

    /// Highlight code with the given language.
    ///
    /// Returns `None` when the language is not recognized or highlighting
    /// fails; the caller decides how to render plain code.
    pub fn highlight(&self, code: &str, lang: &str) -> Option<String> {
        let syntax = self.syntax_set.find_syntax_by_token(lang)?;
        let theme = self.theme()?;

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(lang, error = %e, "syntax highlighting failed");
                None
            }
        }
    }

    fn theme(&self) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(&self.default_theme)
            .or_else(|| self.theme_set.themes.values().next())
    }

    /// Set the default theme.
    pub fn set_theme(&mut self, theme: &str) {
        if self.theme_set.themes.contains_key(theme) {
            self.default_theme = theme.to_string();
        }
    }
}
