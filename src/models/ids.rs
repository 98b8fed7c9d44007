//! Identifier newtypes for items and versions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// System-assigned identifier of an item (node, edge, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// System-assigned identifier of a version.
///
/// The value `0` is reserved as the "no real parent" sentinel. It may be
/// passed as a parent id to `update` calls but never becomes a DAG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(i64);

impl VersionId {
    /// Sentinel parent meaning "no real predecessor".
    pub const NO_PARENT: Self = Self(0);

    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` for the no-parent sentinel.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::NO_PARENT.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VersionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Drops sentinel parents, keeping the order of the real ones.
#[must_use]
pub fn real_parents(parent_ids: &[VersionId]) -> Vec<VersionId> {
    parent_ids
        .iter()
        .copied()
        .filter(|id| !id.is_sentinel())
        .collect()
}
