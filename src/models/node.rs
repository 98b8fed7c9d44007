//! Node items and their versions.

use crate::models::{ItemId, Tag, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node of the catalog graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// System-assigned identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Caller-chosen unique key.
    pub source_key: String,
    /// Tags attached to the node.
    pub tags: BTreeMap<String, Tag>,
}

impl Node {
    /// Creates a node.
    #[must_use]
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        source_key: impl Into<String>,
        tags: BTreeMap<String, Tag>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source_key: source_key.into(),
            tags,
        }
    }
}

/// An immutable version of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVersion {
    /// Version identifier.
    pub id: VersionId,
    /// The node this version belongs to.
    pub node_id: ItemId,
    /// Optional external reference (URL, path, commit, ...).
    pub reference: Option<String>,
    /// Tags attached to the version.
    pub tags: BTreeMap<String, Tag>,
}
