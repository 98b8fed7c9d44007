//! Data models for the catalog.
//!
//! This module contains the item, version, tag and lineage types shared by
//! the storage layer and the item factories.

mod edge;
mod ids;
mod interval;
mod item;
mod node;
mod tag;
mod version_history;

pub use edge::{Edge, EdgeVersion};
pub use ids::{ItemId, VersionId, real_parents};
pub use interval::{LineageInterval, OPEN_END};
pub use item::{ItemKind, ItemRecord};
pub use node::{Node, NodeVersion};
pub use tag::{Tag, TagValue, tag_map};
pub use version_history::{DagNode, TruncationPlan, VersionHistoryDag};
