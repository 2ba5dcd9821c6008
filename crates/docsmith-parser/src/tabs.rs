//! Tabbed sample groups.
//!
//! ```text
//! ::: tabs
//! ::: tab Cargo
//! cargo install docsmith
//! ::: tab Source
//! git clone ...
//! :::
//! ```
//!
//! A new `::: tab` implicitly closes the previous one and the final `:::`
//! closes the whole group. Each tab body goes through its own nested
//! rendering pass; the group is replaced by a comment placeholder in the
//! source and swapped back in once the surrounding document is rendered.

use sha2::{Digest, Sha256};

use crate::escape_html;

const PLACEHOLDER_PREFIX: &str = "<!--docsmith-tabs:";
const PLACEHOLDER_SUFFIX: &str = "-->";

/// Source with tab groups replaced by placeholders, plus the rendered groups.
#[derive(Debug, Default)]
pub(crate) struct ExpandedTabs {
    pub(crate) source: String,
    groups: Vec<String>,
}

impl ExpandedTabs {
    /// Swap every placeholder in rendered HTML for its tab group.
    pub(crate) fn restore(&self, mut html: String) -> String {
        for (index, group) in self.groups.iter().enumerate() {
            let placeholder = placeholder(index);
            if html.contains(&placeholder) {
                html = html.replace(&placeholder, group);
            } else {
                tracing::warn!(index, "tab group placeholder lost during rendering");
            }
        }
        html
    }
}

fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}{PLACEHOLDER_SUFFIX}")
}

/// Tracks whether we are inside a fenced code block, so directive syntax in
/// code samples is left alone.
#[derive(Debug, Default)]
struct FenceTracker {
    fence_char: Option<char>,
    fence_len: usize,
}

impl FenceTracker {
    fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    fn update(&mut self, line: &str) {
        let trimmed = line.trim_start();
        let Some(first) = trimmed.chars().next().filter(|c| *c == '`' || *c == '~') else {
            return;
        };
        let count = trimmed.chars().take_while(|&c| c == first).count();

        match self.fence_char {
            Some(open) => {
                if first == open
                    && count >= self.fence_len
                    && trimmed[count..].chars().all(char::is_whitespace)
                {
                    self.fence_char = None;
                    self.fence_len = 0;
                }
            }
            None if count >= 3 => {
                self.fence_char = Some(first);
                self.fence_len = count;
            }
            None => {}
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Directive {
    Tabs,
    Tab(String),
    Close,
}

fn parse_directive(line: &str) -> Option<Directive> {
    let rest = line.trim().strip_prefix(":::")?.trim();

    if rest.is_empty() {
        return Some(Directive::Close);
    }
    if rest == "tabs" {
        return Some(Directive::Tabs);
    }
    if rest == "tab" {
        return Some(Directive::Tab("Tab".to_string()));
    }
    let label = rest.strip_prefix("tab ")?.trim();
    let label = label
        .strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
        .unwrap_or(label);
    Some(Directive::Tab(label.to_string()))
}

/// One `::: tabs` invocation. Created fresh per group and consumed when the
/// group closes.
#[derive(Debug)]
struct TabGroup {
    start_line: usize,
    raw: Vec<String>,
    tabs: Vec<(String, String)>,
}

impl TabGroup {
    fn new(start_line: usize, opening: &str) -> Self {
        Self {
            start_line,
            raw: vec![opening.to_string()],
            tabs: Vec::new(),
        }
    }

    fn push_body_line(&mut self, line: &str) {
        match self.tabs.last_mut() {
            Some((_, body)) => {
                body.push_str(line);
                body.push('\n');
            }
            None if line.trim().is_empty() => {}
            None => {
                tracing::warn!(
                    line = self.start_line,
                    "content before the first `::: tab` is ignored"
                );
            }
        }
    }

    /// Element id prefix for the group: its position in the source plus a
    /// digest of its text, so the same source always yields the same ids.
    fn group_id(&self, index: usize) -> String {
        let mut hasher = Sha256::new();
        for line in &self.raw {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        let digest = hex::encode(hasher.finalize());
        format!("tabs-{index}-{}", &digest[..8])
    }

    fn render(self, index: usize, render: &dyn Fn(&str) -> String) -> String {
        let group_id = self.group_id(index);
        let panes: Vec<(String, String)> = self
            .tabs
            .into_iter()
            .map(|(label, body)| (label, render(&body)))
            .collect();

        let mut html = String::from("<div class=\"tab-group\">\n<ul class=\"nav nav-tabs\" role=\"tablist\">\n");
        for (i, (label, _)) in panes.iter().enumerate() {
            let active = i == 0;
            html.push_str(&format!(
                "<li class=\"nav-item\" role=\"presentation\"><button class=\"nav-link{}\" id=\"{group_id}-{i}-tab\" data-bs-toggle=\"tab\" data-bs-target=\"#{group_id}-{i}\" type=\"button\" role=\"tab\" aria-controls=\"{group_id}-{i}\" aria-selected=\"{active}\">{}</button></li>\n",
                if active { " active" } else { "" },
                escape_html(label),
            ));
        }
        html.push_str("</ul>\n<div class=\"tab-content\">\n");
        for (i, (_, body)) in panes.iter().enumerate() {
            html.push_str(&format!(
                "<div class=\"tab-pane fade{}\" id=\"{group_id}-{i}\" role=\"tabpanel\" aria-labelledby=\"{group_id}-{i}-tab\">\n{body}</div>\n",
                if i == 0 { " show active" } else { "" },
            ));
        }
        html.push_str("</div>\n</div>\n");
        html
    }
}

/// Replace every well-formed tab group in `input` by a placeholder.
///
/// `render` is used for the nested pass over each tab body. Malformed
/// directives are logged and passed through untouched.
pub(crate) fn expand_tabs(input: &str, render: &dyn Fn(&str) -> String) -> ExpandedTabs {
    if !input.contains(":::") {
        return ExpandedTabs {
            source: input.to_string(),
            groups: Vec::new(),
        };
    }

    let mut out = ExpandedTabs::default();
    let mut fence = FenceTracker::default();
    let mut group: Option<TabGroup> = None;

    for (idx, line) in input.lines().enumerate() {
        let line_num = idx + 1;
        let was_in_fence = fence.in_fence();
        fence.update(line);

        let directive = if was_in_fence || fence.in_fence() {
            None
        } else {
            parse_directive(line)
        };

        let Some(directive) = directive else {
            match group.as_mut() {
                Some(current) => {
                    current.raw.push(line.to_string());
                    current.push_body_line(line);
                }
                None => push_line(&mut out.source, line),
            }
            continue;
        };

        match directive {
            Directive::Tabs => {
                if let Some(current) = group.as_mut() {
                    tracing::warn!(line = line_num, "nested `::: tabs` is not supported");
                    current.raw.push(line.to_string());
                    current.push_body_line(line);
                } else {
                    group = Some(TabGroup::new(line_num, line));
                }
            }
            Directive::Tab(label) => match group.as_mut() {
                Some(current) => {
                    current.raw.push(line.to_string());
                    current.tabs.push((label, String::new()));
                }
                None => {
                    tracing::warn!(line = line_num, "`::: tab` outside `::: tabs`");
                    push_line(&mut out.source, line);
                }
            },
            Directive::Close => match group.take() {
                Some(finished) if finished.tabs.is_empty() => {
                    tracing::warn!(
                        line = finished.start_line,
                        "`::: tabs` with no tabs, skipping"
                    );
                }
                Some(finished) => {
                    let index = out.groups.len();
                    out.groups.push(finished.render(index, render));
                    out.source.push('\n');
                    push_line(&mut out.source, &placeholder(index));
                    out.source.push('\n');
                }
                None => {
                    tracing::warn!(line = line_num, "stray `:::` with no opening directive");
                    push_line(&mut out.source, line);
                }
            },
        }
    }

    if let Some(unclosed) = group {
        tracing::warn!(line = unclosed.start_line, "unclosed `::: tabs` (missing closing `:::`)");
        for line in &unclosed.raw {
            push_line(&mut out.source, line);
        }
    }

    out
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}
