//! Persistence of per-item version-history DAGs.
//!
//! Registered versions live in `version_history_node`, lineage edges in
//! `version_history_edge`; both are keyed by item id and kept apart from
//! the per-kind attribute tables.

use crate::models::{ItemId, TruncationPlan, VersionHistoryDag, VersionId};
use crate::storage::StorageBackend;
use crate::storage::schema::{DAG_EDGE_TABLE, DAG_NODE_TABLE, TAG_TABLE, table};
use crate::storage::value::{Field, Projection};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Reads and writes version-history DAGs.
pub struct VersionHistoryStore {
    storage: Arc<dyn StorageBackend>,
}

impl VersionHistoryStore {
    /// Creates a new store.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Registers a version in an item's DAG. Registering twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for the sentinel, or a storage error.
    #[instrument(skip(self), fields(item_id = %item_id, version_id = %version))]
    pub fn add_version(&self, item_id: ItemId, version: VersionId) -> Result<()> {
        if version.is_sentinel() {
            return Err(Error::InvalidInput(
                "the no-parent sentinel cannot be registered as a version".to_string(),
            ));
        }
        let key = [Field::new("item_id", item_id), Field::new("version_id", version)];
        if self.storage.exists(DAG_NODE_TABLE, &key)? {
            return Ok(());
        }
        self.storage.insert(DAG_NODE_TABLE, &key)
    }

    /// Adds a `parent → child` lineage edge.
    ///
    /// Both versions must already be registered in the item's DAG. A
    /// duplicate edge is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the parent is the sentinel, either
    /// end is unregistered, or the edge would close a cycle.
    #[instrument(skip(self), fields(item_id = %item_id, parent = %parent, child = %child))]
    pub fn add_edge(&self, item_id: ItemId, parent: VersionId, child: VersionId) -> Result<()> {
        if parent.is_sentinel() {
            return Err(Error::InvalidInput(format!(
                "sentinel parent passed for version {child} of item {item_id}"
            )));
        }

        let dag = self.retrieve_from_database(item_id)?;
        for version in [parent, child] {
            if !dag.contains(version) {
                return Err(Error::InvalidInput(format!(
                    "version {version} is not registered for item {item_id}"
                )));
            }
        }
        if dag.has_edge(parent, child) {
            return Ok(());
        }
        if parent == child || dag.is_ancestor(child, parent) {
            return Err(Error::InvalidInput(format!(
                "edge {parent} -> {child} would create a cycle in item {item_id}"
            )));
        }

        self.storage.insert(
            DAG_EDGE_TABLE,
            &[
                Field::new("item_id", item_id),
                Field::new("parent_id", parent),
                Field::new("child_id", child),
            ],
        )
    }

    /// Checks that every version is registered for the item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first unregistered version.
    pub fn verify_registered(&self, item_id: ItemId, versions: &[VersionId]) -> Result<()> {
        if versions.is_empty() {
            return Ok(());
        }
        let dag = self.retrieve_from_database(item_id)?;
        match versions.iter().find(|v| !dag.contains(**v)) {
            Some(missing) => Err(Error::InvalidInput(format!(
                "version {missing} is not registered for item {item_id}"
            ))),
            None => Ok(()),
        }
    }

    /// Rebuilds an item's DAG from storage.
    ///
    /// An item without versions yields an empty DAG.
    ///
    /// # Errors
    ///
    /// Returns an error if a select fails.
    pub fn retrieve_from_database(&self, item_id: ItemId) -> Result<VersionHistoryDag> {
        let key = [Field::new("item_id", item_id)];
        let mut dag = VersionHistoryDag::new(item_id);

        let nodes = self.storage.equality_select(
            DAG_NODE_TABLE,
            &Projection::columns(["version_id"]),
            &key,
        )?;
        for row in nodes.rows() {
            dag.add_version(VersionId::new(row.get_long("version_id")?));
        }

        let edges = self.storage.equality_select(
            DAG_EDGE_TABLE,
            &Projection::columns(["parent_id", "child_id"]),
            &key,
        )?;
        for row in edges.rows() {
            dag.add_edge(
                VersionId::new(row.get_long("parent_id")?),
                VersionId::new(row.get_long("child_id")?),
            );
        }

        Ok(dag)
    }

    /// Prunes every version `num_levels` or more generations behind the leaves.
    ///
    /// Removed versions lose their DAG node, their row in `version_table`
    /// and their tags. Edges out of removed versions are deleted, so a kept
    /// version whose parents were all removed becomes a root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `num_levels` is zero or
    /// `version_table` is unknown, or a storage error.
    #[instrument(skip(self))]
    pub fn truncate(
        &self,
        item_id: ItemId,
        num_levels: usize,
        version_table: &str,
    ) -> Result<TruncationPlan> {
        if num_levels == 0 {
            return Err(Error::InvalidInput(
                "truncation must keep at least one level".to_string(),
            ));
        }
        table(version_table)?.column("id")?;

        let dag = self.retrieve_from_database(item_id)?;
        let plan = dag.plan_truncation(num_levels);
        if plan.is_noop() {
            return Ok(plan);
        }

        // Edges first, so an interrupted run never leaves an edge to a missing node.
        for (parent, child) in &plan.dropped_edges {
            self.storage.delete(
                DAG_EDGE_TABLE,
                &[
                    Field::new("item_id", item_id),
                    Field::new("parent_id", *parent),
                    Field::new("child_id", *child),
                ],
            )?;
        }
        for version in &plan.removed {
            self.storage.delete(
                DAG_NODE_TABLE,
                &[Field::new("item_id", item_id), Field::new("version_id", *version)],
            )?;
            self.storage
                .delete(version_table, &[Field::new("id", *version)])?;
            self.storage
                .delete(TAG_TABLE, &[Field::new("owner_id", *version)])?;
        }

        tracing::info!(
            item_id = %item_id,
            removed = plan.removed.len(),
            retained = plan.retained.len(),
            "Truncated version history"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::storage::schema::NODE_VERSION_TABLE;

    fn v(id: i64) -> VersionId {
        VersionId::new(id)
    }

    fn store() -> (VersionHistoryStore, Arc<dyn StorageBackend>) {
        let storage: Arc<dyn StorageBackend> = Arc::new(InMemoryStorage::new());
        (VersionHistoryStore::new(Arc::clone(&storage)), storage)
    }

    #[test]
    fn test_add_and_retrieve() {
        let (store, _) = store();
        let item = ItemId::new(1);
        store.add_version(item, v(10)).unwrap();
        store.add_version(item, v(11)).unwrap();
        store.add_version(item, v(11)).unwrap();
        store.add_edge(item, v(10), v(11)).unwrap();
        store.add_edge(item, v(10), v(11)).unwrap();

        let dag = store.retrieve_from_database(item).unwrap();
        assert_eq!(dag.len(), 2);
        assert_eq!(dag.edge_count(), 1);
        assert_eq!(dag.get_parent(v(11)), vec![v(10)]);
        assert!(dag.get_parent(v(10)).is_empty());
    }

    #[test]
    fn test_dags_are_per_item() {
        let (store, _) = store();
        store.add_version(ItemId::new(1), v(10)).unwrap();
        assert!(store.retrieve_from_database(ItemId::new(2)).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_sentinel_unregistered_and_cycles() {
        let (store, _) = store();
        let item = ItemId::new(1);
        store.add_version(item, v(10)).unwrap();
        store.add_version(item, v(11)).unwrap();

        assert!(matches!(
            store.add_edge(item, VersionId::NO_PARENT, v(10)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            store.add_edge(item, v(99), v(10)),
            Err(Error::InvalidInput(_))
        ));
        store.add_edge(item, v(10), v(11)).unwrap();
        assert!(matches!(
            store.add_edge(item, v(11), v(10)),
            Err(Error::InvalidInput(_))
        ));
        assert!(store.add_version(item, VersionId::NO_PARENT).is_err());
    }

    #[test]
    fn test_truncate_removes_rows() {
        let (store, storage) = store();
        let item = ItemId::new(1);
        for id in 1..=4 {
            store.add_version(item, v(id)).unwrap();
            storage
                .insert(
                    NODE_VERSION_TABLE,
                    &[Field::new("id", id), Field::new("node_id", item)],
                )
                .unwrap();
            storage
                .insert(TAG_TABLE, &[Field::new("owner_id", id), Field::new("key", "k")])
                .unwrap();
        }
        for id in 2..=4 {
            store.add_edge(item, v(id - 1), v(id)).unwrap();
        }

        let plan = store.truncate(item, 2, NODE_VERSION_TABLE).unwrap();
        assert_eq!(plan.retained, vec![v(3), v(4)]);

        let dag = store.retrieve_from_database(item).unwrap();
        assert_eq!(dag.len(), 2);
        assert!(dag.get_parent(v(3)).is_empty());
        assert!(!storage.exists(NODE_VERSION_TABLE, &[Field::new("id", 1_i64)]).unwrap());
        assert!(!storage.exists(TAG_TABLE, &[Field::new("owner_id", 2_i64)]).unwrap());
        assert!(storage.exists(TAG_TABLE, &[Field::new("owner_id", 3_i64)]).unwrap());
    }

    #[test]
    fn test_truncate_rejects_zero_levels() {
        let (store, _) = store();
        assert!(matches!(
            store.truncate(ItemId::new(1), 0, NODE_VERSION_TABLE),
            Err(Error::InvalidInput(_))
        ));
        assert!(store.truncate(ItemId::new(1), 1, "missing").is_err());
    }
}
