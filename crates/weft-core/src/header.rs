//! Header storage conventions shared by the locator and the mutator.
//!
//! A header property used by a mapped connection type is always in one of
//! three shapes: absent, a bare scalar, or a list. [`PropertyShape`] makes
//! the promotion rule (every write normalizes toward "list" without data
//! loss) a total, exhaustively matched function instead of scattered
//! is-array checks.

use serde_json::Value;
use std::collections::BTreeMap;

/// A parsed document header: the structured key→value front-section of a
/// document, distinct from its body text.
pub type Header = BTreeMap<String, Value>;

/// Name of the generic list property that stores unmapped connections.
pub const CONNECTIONS_KEY: &str = "connections";

/// Record key holding an unmapped connection's type text.
pub const RECORD_TEXT_KEY: &str = "connectionText";

/// Record key holding an unmapped connection's link text.
pub const RECORD_TARGET_KEY: &str = "target";

/// The three shapes a connection-bearing header property can take.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyShape {
    Absent,
    Scalar(Value),
    List(Vec<Value>),
}

impl PropertyShape {
    pub fn of(header: &Header, key: &str) -> PropertyShape {
        match header.get(key) {
            None => PropertyShape::Absent,
            Some(Value::Array(items)) => PropertyShape::List(items.clone()),
            Some(other) => PropertyShape::Scalar(other.clone()),
        }
    }

    /// Normalizes toward the list shape: absent becomes empty, a scalar
    /// becomes a single-element list. Never drops a value.
    pub fn promoted(self) -> Vec<Value> {
        match self {
            PropertyShape::Absent => Vec::new(),
            PropertyShape::Scalar(value) => vec![value],
            PropertyShape::List(items) => items,
        }
    }
}

/// Appends `value` to `header[key]`, promoting the property to a list first.
pub fn push_entry(header: &mut Header, key: &str, value: Value) {
    let mut items = PropertyShape::of(header, key).promoted();
    items.push(value);
    header.insert(key.to_string(), Value::Array(items));
}

/// Every string leaf of a header with its dotted key path: a scalar under
/// `prop` yields `prop`, list entries yield `prop.<idx>`, record fields
/// yield `connections.<idx>.target` and the like. This is the key format
/// the reverse-link index reports and the locator consumes.
pub fn string_leaves(header: &Header) -> Vec<(String, String)> {
    fn walk(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
        match value {
            Value::String(s) => out.push((prefix, s.clone())),
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    walk(format!("{prefix}.{idx}"), item, out);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    walk(format!("{prefix}.{key}"), item, out);
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    for (key, value) in header {
        walk(key.clone(), value, &mut out);
    }
    out
}
