//! Item kinds and the kind-independent item record.

use crate::models::{ItemId, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a versioned item.
///
/// Each kind has its own attribute table and version table; the shared
/// `item` and `tag` tables are keyed only by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A node of the catalog graph.
    Node,
    /// A directed connection between two nodes.
    Edge,
}

impl ItemKind {
    /// Returns every kind.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Node, Self::Edge]
    }

    /// Returns the stable string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
        }
    }

    /// Parses a kind from its string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "node" => Some(Self::Node),
            "edge" => Some(Self::Edge),
            _ => None,
        }
    }

    /// Table holding the item attributes of this kind.
    #[must_use]
    pub const fn item_table(&self) -> &'static str {
        self.as_str()
    }

    /// Table holding the versions of this kind.
    #[must_use]
    pub const fn version_table(&self) -> &'static str {
        match self {
            Self::Node => "node_version",
            Self::Edge => "edge_version",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-independent view of an item as stored by the item lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    /// System-assigned identifier.
    pub id: ItemId,
    /// The item kind.
    pub kind: ItemKind,
    /// Tags attached to the item.
    pub tags: BTreeMap<String, Tag>,
}

impl ItemRecord {
    /// Returns the tags of the item.
    #[must_use]
    pub const fn tags(&self) -> &BTreeMap<String, Tag> {
        &self.tags
    }
}
