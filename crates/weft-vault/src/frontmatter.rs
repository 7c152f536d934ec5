//! YAML frontmatter codec.
//!
//! A header block starts on the first line of the document with `---` and
//! ends at the next `---` or `...` line. Header values are bridged into
//! `serde_json::Value`, the representation the engine works in; YAML that
//! does not form a string-keyed mapping is reported as malformed rather
//! than silently ignored.

use serde_json::Value;
use std::collections::BTreeMap;
use weft_core::Header;

const BOM: char = '\u{feff}';

/// Outcome of splitting a document into header block and body.
#[derive(Debug, PartialEq)]
pub(crate) enum HeaderBlock<'a> {
    /// The document has no frontmatter block.
    Absent { body: &'a str },
    Parsed { header: Header, body: &'a str },
    /// A frontmatter block exists but is unterminated or is not a
    /// string-keyed YAML mapping.
    Malformed,
}

pub(crate) fn split(content: &str) -> HeaderBlock<'_> {
    let text = content.strip_prefix(BOM).unwrap_or(content);
    let after_open = match text.strip_prefix("---") {
        Some(rest) if rest.is_empty() => rest,
        Some(rest) if rest.starts_with('\n') || rest.starts_with("\r\n") => rest,
        _ => return HeaderBlock::Absent { body: content },
    };

    let mut yaml_end = None;
    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" || trimmed == "..." {
            yaml_end = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }
    let Some((yaml_end, body_start)) = yaml_end else {
        return HeaderBlock::Malformed;
    };

    let yaml = &after_open[..yaml_end];
    let body = &after_open[body_start..];
    if yaml.trim().is_empty() {
        return HeaderBlock::Parsed {
            header: Header::new(),
            body,
        };
    }
    match serde_yaml::from_str::<BTreeMap<String, Value>>(yaml) {
        Ok(header) => HeaderBlock::Parsed { header, body },
        Err(error) => {
            tracing::warn!(%error, "unparseable frontmatter block");
            HeaderBlock::Malformed
        }
    }
}

/// Renders a header and body back into document text. An empty header
/// drops the block entirely.
pub(crate) fn render(header: &Header, body: &str) -> String {
    if header.is_empty() {
        return body.to_string();
    }
    match serde_yaml::to_string(header) {
        Ok(yaml) => format!("---\n{yaml}---\n{body}"),
        Err(error) => {
            // Header values come from JSON-compatible edits; YAML can
            // represent all of them.
            tracing::warn!(%error, "failed to render frontmatter, keeping body only");
            body.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_without_block() {
        assert_eq!(
            split("# Title\nbody\n"),
            HeaderBlock::Absent {
                body: "# Title\nbody\n"
            }
        );
        // A --- later in the document is not frontmatter.
        assert_eq!(
            split("intro\n---\nkey: value\n---\n"),
            HeaderBlock::Absent {
                body: "intro\n---\nkey: value\n---\n"
            }
        );
    }

    #[test]
    fn parses_block_and_body() {
        let doc = "---\nsupports:\n  - \"[[b]]\"\ntitle: A\n---\nbody text\n";
        let HeaderBlock::Parsed { header, body } = split(doc) else {
            panic!("expected parsed header");
        };
        assert_eq!(header["supports"], json!(["[[b]]"]));
        assert_eq!(header["title"], json!("A"));
        assert_eq!(body, "body text\n");
    }

    #[test]
    fn tolerates_bom_and_dot_terminator() {
        let doc = "\u{feff}---\nkey: value\n...\nbody";
        let HeaderBlock::Parsed { header, body } = split(doc) else {
            panic!("expected parsed header");
        };
        assert_eq!(header["key"], json!("value"));
        assert_eq!(body, "body");
    }

    #[test]
    fn empty_block_is_an_empty_header() {
        let HeaderBlock::Parsed { header, body } = split("---\n---\nbody") else {
            panic!("expected parsed header");
        };
        assert!(header.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn unterminated_or_non_mapping_blocks_are_malformed() {
        assert_eq!(split("---\nkey: value\n"), HeaderBlock::Malformed);
        assert_eq!(split("---\n- a\n- b\n---\n"), HeaderBlock::Malformed);
        assert_eq!(split("---\n[unclosed\n---\n"), HeaderBlock::Malformed);
    }

    #[test]
    fn render_round_trips_through_split() {
        let mut header = Header::new();
        header.insert("supports".to_string(), json!(["[[b]]", "[[c]]"]));
        header.insert(
            "connections".to_string(),
            json!([{ "connectionText": "related-to", "target": "[[b]]" }]),
        );
        let rendered = render(&header, "body\n");
        let HeaderBlock::Parsed {
            header: reparsed,
            body,
        } = split(&rendered)
        else {
            panic!("expected parsed header");
        };
        assert_eq!(reparsed, header);
        assert_eq!(body, "body\n");
    }

    #[test]
    fn empty_header_renders_bare_body() {
        assert_eq!(render(&Header::new(), "body\n"), "body\n");
    }
}
