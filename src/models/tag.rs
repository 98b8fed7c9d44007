//! Tags: named, typed metadata attached to items and versions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed tag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TagValue {
    /// Free text.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
}

impl TagValue {
    /// Returns the name of the value type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for TagValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for TagValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// A named tag. A tag without a value acts as a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub key: String,
    /// Optional typed value.
    pub value: Option<TagValue>,
}

impl Tag {
    /// Creates a tag with a value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Creates a value-less label tag.
    #[must_use]
    pub fn label(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Builds a tag map keyed by tag name.
///
/// Later tags with the same key replace earlier ones.
#[must_use]
pub fn tag_map(tags: impl IntoIterator<Item = Tag>) -> BTreeMap<String, Tag> {
    tags.into_iter().map(|t| (t.key.clone(), t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_value_serialization() {
        let json = serde_json::to_string(&TagValue::Integer(3)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":3}"#);

        let parsed: TagValue = serde_json::from_str(r#"{"type":"string","value":"v"}"#).unwrap();
        assert_eq!(parsed, TagValue::String("v".to_string()));
    }

    #[test]
    fn test_tag_map_last_wins() {
        let tags = tag_map([Tag::new("k", "a"), Tag::label("l"), Tag::new("k", 2)]);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["k"].value, Some(TagValue::Integer(2)));
        assert_eq!(tags["l"].value, None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TagValue::from(true).to_string(), "true");
        assert_eq!(TagValue::from("x").type_name(), "string");
    }
}
