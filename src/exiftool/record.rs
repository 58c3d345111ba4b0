//! Per-file metadata as reported by ExifTool.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Tag name key that ExifTool always adds to each JSON object.
pub const SOURCE_FILE_TAG: &str = "SourceFile";

/// Tag name to value mapping for one file.
///
/// Keys are group-qualified (`EXIF:DateTimeOriginal`) because the worker runs
/// with `-G`. Values keep the JSON type ExifTool chose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    tags: BTreeMap<String, Value>,
}

impl MetadataRecord {
    /// Build a record from `(tag, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            tags: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw JSON value of a tag.
    pub fn get(&self, tag: &str) -> Option<&Value> {
        self.tags.get(tag)
    }

    /// Textual view of a tag value. `null` counts as absent.
    pub fn value_text(&self, tag: &str) -> Option<String> {
        self.tags.get(tag).and_then(value_to_text)
    }

    /// Tag names present in this record.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// `(tag, value)` pairs in tag-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The `SourceFile` ExifTool echoed back, if any.
    pub fn source_file(&self) -> Option<&str> {
        self.tags.get(SOURCE_FILE_TAG).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Render a JSON value the way it should appear in a text cell.
///
/// Lists are joined with ", " like ExifTool does in its text output.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}
