//! Edge items and their versions.
//!
//! An edge connects two nodes fixed at creation. Each edge version records,
//! for both endpoints, the [`LineageInterval`] of the endpoint node's
//! versions during which it is the connector on that side.

use crate::models::{ItemId, LineageInterval, Tag, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// System-assigned identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Caller-chosen unique key.
    pub source_key: String,
    /// Originating node. Immutable after creation.
    pub from_node_id: ItemId,
    /// Destination node. Immutable after creation.
    pub to_node_id: ItemId,
    /// Tags attached to the edge.
    pub tags: BTreeMap<String, Tag>,
}

impl Edge {
    /// Creates an edge.
    #[must_use]
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        source_key: impl Into<String>,
        from_node_id: ItemId,
        to_node_id: ItemId,
        tags: BTreeMap<String, Tag>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source_key: source_key.into(),
            from_node_id,
            to_node_id,
            tags,
        }
    }
}

/// An immutable version of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeVersion {
    /// Version identifier.
    pub id: VersionId,
    /// The edge this version belongs to.
    pub edge_id: ItemId,
    /// Interval over the originating node's lineage.
    pub from_interval: LineageInterval,
    /// Interval over the destination node's lineage.
    pub to_interval: LineageInterval,
    /// Tags attached to the version.
    pub tags: BTreeMap<String, Tag>,
}

impl EdgeVersion {
    /// First originating node version this edge version connects.
    #[must_use]
    pub const fn from_node_version_start_id(&self) -> VersionId {
        self.from_interval.start
    }

    /// Originating node version that closed this edge version, `None` while open.
    #[must_use]
    pub const fn from_node_version_end_id(&self) -> Option<VersionId> {
        self.from_interval.end
    }

    /// First destination node version this edge version connects.
    #[must_use]
    pub const fn to_node_version_start_id(&self) -> VersionId {
        self.to_interval.start
    }

    /// Destination node version that closed this edge version, `None` while open.
    #[must_use]
    pub const fn to_node_version_end_id(&self) -> Option<VersionId> {
        self.to_interval.end
    }

    /// Returns `true` if still the connector on the originating side.
    #[must_use]
    pub const fn is_open_from(&self) -> bool {
        self.from_interval.is_open()
    }

    /// Returns `true` if still the connector on the destination side.
    #[must_use]
    pub const fn is_open_to(&self) -> bool {
        self.to_interval.is_open()
    }

    /// Returns `true` if this version started at exactly these two node
    /// versions and is still open on both sides.
    #[must_use]
    pub fn connects(&self, from_version: VersionId, to_version: VersionId) -> bool {
        self.from_interval.start == from_version
            && self.to_interval.start == to_version
            && self.is_open_from()
            && self.is_open_to()
    }
}
