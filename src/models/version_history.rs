//! Per-item version-history DAG.
//!
//! The [`VersionHistoryDag`] holds the version ids of one item and the
//! `parent → child` lineage edges between them. A version with no parent is
//! a root; a version with no child is a leaf (a current head). Multiple
//! parents record a merge, multiple children a branch.
//!
//! The no-parent sentinel ([`VersionId::NO_PARENT`]) is never a node.

use crate::models::{ItemId, VersionId};
use std::collections::{HashMap, HashSet, VecDeque};

/// A node of the version DAG with its bidirectional links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DagNode {
    /// Direct parents, in insertion order.
    pub parents: Vec<VersionId>,
    /// Direct children, in insertion order.
    pub children: Vec<VersionId>,
}

/// Versions removed and lineage edges dropped by a truncation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TruncationPlan {
    /// Versions that are kept, sorted.
    pub retained: Vec<VersionId>,
    /// Versions that are removed, sorted.
    pub removed: Vec<VersionId>,
    /// Edges `(parent, child)` that are dropped, sorted.
    pub dropped_edges: Vec<(VersionId, VersionId)>,
}

impl TruncationPlan {
    /// Returns `true` if the truncation changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.dropped_edges.is_empty()
    }
}

/// Version lineage of a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionHistoryDag {
    item_id: ItemId,
    nodes: HashMap<VersionId, DagNode>,
    /// Registration order, for deterministic iteration.
    order: Vec<VersionId>,
}

impl VersionHistoryDag {
    /// Creates an empty DAG for an item.
    #[must_use]
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            nodes: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The item this DAG belongs to.
    #[must_use]
    pub const fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Registers a version. Registering twice is a no-op; the sentinel is ignored.
    pub fn add_version(&mut self, version: VersionId) {
        if version.is_sentinel() || self.nodes.contains_key(&version) {
            return;
        }
        self.nodes.insert(version, DagNode::default());
        self.order.push(version);
    }

    /// Adds a `parent → child` edge, registering both ends.
    ///
    /// Returns `false` (and changes nothing) if either end is the sentinel
    /// or the edge already exists.
    pub fn add_edge(&mut self, parent: VersionId, child: VersionId) -> bool {
        if parent.is_sentinel() || child.is_sentinel() || self.has_edge(parent, child) {
            return false;
        }
        self.add_version(parent);
        self.add_version(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parents.push(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        true
    }

    /// Returns `true` if the edge `parent → child` exists.
    #[must_use]
    pub fn has_edge(&self, parent: VersionId, child: VersionId) -> bool {
        self.nodes
            .get(&child)
            .is_some_and(|n| n.parents.contains(&parent))
    }

    /// Returns the direct parents of a version (empty for roots and unknown versions).
    #[must_use]
    pub fn get_parent(&self, version: VersionId) -> Vec<VersionId> {
        self.nodes
            .get(&version)
            .map(|n| n.parents.clone())
            .unwrap_or_default()
    }

    /// Returns the direct children of a version.
    #[must_use]
    pub fn get_children(&self, version: VersionId) -> Vec<VersionId> {
        self.nodes
            .get(&version)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if the version is registered.
    #[must_use]
    pub fn contains(&self, version: VersionId) -> bool {
        self.nodes.contains_key(&version)
    }

    /// Number of versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no version is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of lineage edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.parents.len()).sum()
    }

    /// Versions in registration order.
    pub fn versions(&self) -> impl Iterator<Item = VersionId> + '_ {
        self.order.iter().copied()
    }

    /// All edges `(parent, child)` in child registration order.
    #[must_use]
    pub fn edges(&self) -> Vec<(VersionId, VersionId)> {
        self.versions()
            .flat_map(|child| {
                self.get_parent(child)
                    .into_iter()
                    .map(move |parent| (parent, child))
            })
            .collect()
    }

    /// Versions without parents, in registration order.
    #[must_use]
    pub fn roots(&self) -> Vec<VersionId> {
        self.versions()
            .filter(|v| self.nodes.get(v).is_some_and(|n| n.parents.is_empty()))
            .collect()
    }

    /// Versions without children (current heads), in registration order.
    #[must_use]
    pub fn leaves(&self) -> Vec<VersionId> {
        self.versions()
            .filter(|v| self.nodes.get(v).is_some_and(|n| n.children.is_empty()))
            .collect()
    }

    /// Transitive parents of a version, excluding itself.
    #[must_use]
    pub fn ancestors(&self, version: VersionId) -> HashSet<VersionId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<VersionId> = self.get_parent(version).into();
        while let Some(current) = queue.pop_front() {
            if visited.insert(current) {
                queue.extend(self.get_parent(current));
            }
        }
        visited
    }

    /// Returns `true` if `a` is a strict ancestor of `b`.
    #[must_use]
    pub fn is_ancestor(&self, a: VersionId, b: VersionId) -> bool {
        a != b && self.ancestors(b).contains(&a)
    }

    /// Height of every version: the longest distance, in edges, from any
    /// leaf up to it. Leaves have height 0.
    #[must_use]
    pub fn heights(&self) -> HashMap<VersionId, usize> {
        let mut pending: HashMap<VersionId, usize> = self
            .nodes
            .iter()
            .map(|(v, n)| (*v, n.children.len()))
            .collect();
        let mut heights: HashMap<VersionId, usize> = HashMap::with_capacity(self.nodes.len());
        let mut ready: VecDeque<VersionId> = self.leaves().into();
        for leaf in &ready {
            heights.insert(*leaf, 0);
        }

        while let Some(current) = ready.pop_front() {
            let height = heights.get(&current).copied().unwrap_or(0);
            for parent in self.get_parent(current) {
                let entry = heights.entry(parent).or_insert(0);
                *entry = (*entry).max(height + 1);
                if let Some(remaining) = pending.get_mut(&parent) {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        ready.push_back(parent);
                    }
                }
            }
        }
        heights
    }

    /// Number of versions on the longest path from a leaf to a root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.heights().values().max().map_or(0, |h| h + 1)
    }

    /// Plans a truncation keeping `num_levels` generations behind the leaves.
    ///
    /// A version is kept when its height is below `num_levels`. Children of
    /// a kept version are always kept, so every kept path from a leaf has
    /// at most `num_levels` versions. Edges whose parent is removed are
    /// dropped and their children become roots.
    #[must_use]
    pub fn plan_truncation(&self, num_levels: usize) -> TruncationPlan {
        let heights = self.heights();
        let keep = |v: &VersionId| heights.get(v).is_some_and(|h| *h < num_levels);

        let mut retained: Vec<VersionId> = self.nodes.keys().copied().filter(keep).collect();
        let mut removed: Vec<VersionId> = self
            .nodes
            .keys()
            .copied()
            .filter(|v| !keep(v))
            .collect();
        let mut dropped_edges: Vec<(VersionId, VersionId)> = self
            .edges()
            .into_iter()
            .filter(|(parent, _)| !keep(parent))
            .collect();

        retained.sort();
        removed.sort();
        dropped_edges.sort();
        TruncationPlan {
            retained,
            removed,
            dropped_edges,
        }
    }

    /// Applies a truncation plan in memory.
    pub fn apply_truncation(&mut self, plan: &TruncationPlan) {
        let removed: HashSet<VersionId> = plan.removed.iter().copied().collect();
        self.nodes.retain(|v, _| !removed.contains(v));
        self.order.retain(|v| !removed.contains(v));
        for node in self.nodes.values_mut() {
            node.parents.retain(|p| !removed.contains(p));
            node.children.retain(|c| !removed.contains(c));
        }
    }
}
