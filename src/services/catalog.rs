//! Catalog wiring.
//!
//! A [`Catalog`] owns one storage backend, one identifier generator and one
//! instance of every factory, built once and shared by reference.

use crate::config::{CatalogConfig, StorageBackendType};
use crate::services::{
    EdgeFactory, EdgeVersionFactory, IdGenerator, ItemStore, NodeFactory, NodeVersionFactory,
};
use crate::storage::{InMemoryStorage, SqliteStorage, StorageBackend};
use crate::Result;
use std::sync::Arc;

/// Entry point bundling storage and factories.
pub struct Catalog {
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    items: Arc<ItemStore>,
    nodes: Arc<NodeFactory>,
    node_versions: NodeVersionFactory,
    edges: Arc<EdgeFactory>,
    edge_versions: EdgeVersionFactory,
}

impl Catalog {
    /// Opens the backend selected by `config`.
    ///
    /// Identifiers come from a storage sequence, so a reopened `SQLite`
    /// catalog never reissues an id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened.
    pub fn open(config: &CatalogConfig) -> Result<Self> {
        let storage: Arc<dyn StorageBackend> = match config.storage.backend {
            StorageBackendType::Sqlite => Arc::new(SqliteStorage::new(&config.storage.path)?),
            StorageBackendType::Memory => Arc::new(InMemoryStorage::new()),
        };
        tracing::info!(
            backend = storage.backend_name(),
            path = %config.storage.path.display(),
            "Opened catalog"
        );
        let ids = IdGenerator::persistent(Arc::clone(&storage));
        Ok(Self::with_storage(storage, ids))
    }

    /// Creates a catalog on fresh in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        let storage: Arc<dyn StorageBackend> = Arc::new(InMemoryStorage::new());
        Self::with_storage(storage, IdGenerator::local(1))
    }

    /// Creates a catalog on the given storage and id generator.
    #[must_use]
    pub fn with_storage(storage: Arc<dyn StorageBackend>, ids: IdGenerator) -> Self {
        let ids = Arc::new(ids);
        let items = Arc::new(ItemStore::new(Arc::clone(&storage)));
        let nodes = Arc::new(NodeFactory::new(
            Arc::clone(&storage),
            Arc::clone(&ids),
            Arc::clone(&items),
        ));
        let node_versions = NodeVersionFactory::new(
            Arc::clone(&storage),
            Arc::clone(&ids),
            Arc::clone(&items),
            Arc::clone(&nodes),
        );
        let edges = Arc::new(EdgeFactory::new(
            Arc::clone(&storage),
            Arc::clone(&ids),
            Arc::clone(&items),
        ));
        let edge_versions = EdgeVersionFactory::new(
            Arc::clone(&storage),
            Arc::clone(&ids),
            Arc::clone(&items),
            Arc::clone(&edges),
        );

        Self {
            storage,
            ids,
            items,
            nodes,
            node_versions,
            edges,
            edge_versions,
        }
    }

    /// The storage backend.
    #[must_use]
    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    /// The identifier generator.
    #[must_use]
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Shared item, tag and history storage.
    #[must_use]
    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    /// Node factory.
    #[must_use]
    pub fn nodes(&self) -> &NodeFactory {
        &self.nodes
    }

    /// Node version factory.
    #[must_use]
    pub const fn node_versions(&self) -> &NodeVersionFactory {
        &self.node_versions
    }

    /// Edge factory.
    #[must_use]
    pub fn edges(&self) -> &EdgeFactory {
        &self.edges
    }

    /// Edge version factory.
    #[must_use]
    pub const fn edge_versions(&self) -> &EdgeVersionFactory {
        &self.edge_versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemFactory;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_catalog() {
        let catalog = Catalog::in_memory();
        assert_eq!(catalog.storage().backend_name(), "memory");
        assert!(!catalog.ids().is_persistent());
        let node = catalog.nodes().create("n", "n", BTreeMap::new()).unwrap();
        assert_eq!(catalog.items().retrieve_from_database(node.id).unwrap().id, node.id);
    }

    #[test]
    fn test_open_sqlite_keeps_ids_across_reopen() {
        let dir = TempDir::new().unwrap();
        let config = CatalogConfig::new().with_db_path(dir.path().join("catalog.db"));

        let first = {
            let catalog = Catalog::open(&config).unwrap();
            catalog.nodes().create("a", "a", BTreeMap::new()).unwrap()
        };

        let catalog = Catalog::open(&config).unwrap();
        assert_eq!(catalog.storage().backend_name(), "sqlite");
        assert_eq!(catalog.nodes().retrieve_from_database("a").unwrap(), first);
        let second = catalog.nodes().create("b", "b", BTreeMap::new()).unwrap();
        assert!(second.id.get() > first.id.get());
    }

    #[test]
    fn test_open_memory_from_config() {
        let catalog = Catalog::open(&CatalogConfig::in_memory()).unwrap();
        assert_eq!(catalog.storage().backend_name(), "memory");
        assert!(catalog.ids().is_persistent());
    }
}
