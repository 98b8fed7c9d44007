//! Business logic services.
//!
//! Factories orchestrate the storage backend, the identifier generator and
//! the version-history store to implement the item lifecycle.

mod catalog;
mod edge;
mod id_generator;
mod item;
mod node;
mod version_history;

pub use catalog::Catalog;
pub use edge::{EdgeFactory, EdgeVersionFactory};
pub use id_generator::{ID_SEQUENCE, IdGenerator};
pub use item::{ItemFactory, ItemStore};
pub use node::{NodeFactory, NodeVersionFactory};
pub use version_history::VersionHistoryStore;
