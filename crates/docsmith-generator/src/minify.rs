//! HTML minification that leaves preformatted regions alone.
//!
//! `<pre>` blocks and then the remaining `<code>` spans are lifted out
//! verbatim and replaced by positional tokens. The rest has comments removed,
//! whitespace runs collapsed and lines trimmed, after which the protected
//! regions are put back by exact token match.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PRE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre\b.*?</pre>").expect("valid pre pattern"));
static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<code\b.*?</code>").expect("valid code pattern"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\u{E000}MINIFY([0-9]+)\u{E000}").expect("valid token pattern")
});

fn token(index: usize) -> String {
    format!("\u{E000}MINIFY{index}\u{E000}")
}

/// Minify an HTML document. Running it twice gives the same output.
pub fn minify(html: &str) -> String {
    let mut protected: Vec<String> = Vec::new();

    let mut protect = |caps: &Captures<'_>| {
        protected.push(caps[0].to_string());
        token(protected.len() - 1)
    };
    let text = PRE_BLOCK.replace_all(html, &mut protect).into_owned();
    let text = CODE_SPAN.replace_all(&text, &mut protect).into_owned();

    let mut text = text;
    // Removing one comment can join the halves of another.
    while COMMENT.is_match(&text) {
        text = COMMENT.replace_all(&text, "").into_owned();
    }
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    let text = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    let text = text.trim();

    TOKEN
        .replace_all(text, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| protected.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
