use std::sync::LazyLock;

use regex::Regex;

/// `[[target]]` or `[[target|display]]`. The target may not contain `]` or
/// `|`; the display text may not contain `]`.
static WIKI_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap());

/// A single wiki link occurrence inside a note body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// Path of the linked note, trimmed.
    pub target_path: String,
    /// Display text after `|`, if any.
    pub display_text: Option<String>,
    /// 1-based line number of the occurrence.
    pub line_number: u32,
}

/// Extract all wiki links from a note body, in document order.
pub fn extract_links(content: &str) -> Vec<WikiLink> {
    let mut links = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        for caps in WIKI_LINK_RE.captures_iter(line) {
            links.push(WikiLink {
                target_path: caps[1].trim().to_string(),
                display_text: caps.get(2).map(|m| m.as_str().trim().to_string()),
                line_number: (idx + 1) as u32,
            });
        }
    }
    links
}

/// Rewrite every link pointing exactly at `old_target` to `new_target`,
/// preserving display text. Targets are compared whole, never as substrings:
/// renaming `notes/a` must not touch `notes/ab` or `other/notes/a`.
pub fn replace_link_target(content: &str, old_target: &str, new_target: &str) -> String {
    WIKI_LINK_RE
        .replace_all(content, |caps: &regex::Captures<'_>| {
            if caps[1].trim() == old_target {
                match caps.get(2) {
                    Some(display) => format!("[[{}|{}]]", new_target, display.as_str()),
                    None => format!("[[{new_target}]]"),
                }
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
