//! Wikilink text helpers.
//!
//! Header values reference documents as `[[link text]]`. These helpers
//! round-trip between that raw form and the bare link text; resolution to a
//! document handle is the host's job.

use regex::Regex;
use std::sync::OnceLock;

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[?\[?([^\[\]]+)\]?\]?").unwrap())
}

/// Removes surrounding `[[`/`]]` from a link if present, and trims any
/// alias (`|alias`) or heading (`#heading`) suffix.
pub fn strip_link(link: &str) -> &str {
    let inner = match link_regex().captures(link) {
        Some(caps) => caps.get(1).map_or(link, |m| m.as_str()),
        None => link,
    };
    let inner = inner.split(['|', '#']).next().unwrap_or(inner);
    inner.trim()
}

/// Wraps bare link text as `[[text]]`.
pub fn wrap_link(text: &str) -> String {
    format!("[[{text}]]")
}

/// Whether a header value is wikilink-shaped.
pub fn is_wiki_link(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("[[") && trimmed.ends_with("]]")
}
