//! Node items and their versions.

use crate::models::{
    ItemId, ItemKind, Node, NodeVersion, Tag, TruncationPlan, VersionId, real_parents,
};
use crate::services::{IdGenerator, ItemFactory, ItemStore};
use crate::storage::StorageBackend;
use crate::storage::schema::{NODE_TABLE, NODE_VERSION_TABLE};
use crate::storage::value::{Field, Projection, Row};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Creates and loads nodes.
pub struct NodeFactory {
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    items: Arc<ItemStore>,
}

impl NodeFactory {
    /// Creates a new node factory.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        ids: Arc<IdGenerator>,
        items: Arc<ItemStore>,
    ) -> Self {
        Self {
            storage,
            ids,
            items,
        }
    }

    /// Creates a node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemAlreadyExists`] if the source key is taken, or a
    /// storage error.
    #[instrument(skip(self, tags))]
    pub fn create(
        &self,
        name: &str,
        source_key: &str,
        tags: BTreeMap<String, Tag>,
    ) -> Result<Node> {
        self.verify_item_not_exists(source_key)?;

        let id = self.ids.generate_item_id()?;
        self.items.insert_into_database(id, ItemKind::Node, &tags)?;
        self.storage.insert(
            NODE_TABLE,
            &[
                Field::new("name", name),
                Field::new("item_id", id),
                Field::new("source_key", source_key),
            ],
        )?;

        tracing::info!(item_id = %id, source_key, "Created node");
        metrics::counter!("vercat_items_created_total", "kind" => "node").increment(1);
        Ok(Node::new(id, name, source_key, tags))
    }

    /// Retrieves a node by item id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if no node has the id.
    pub fn retrieve_by_id(&self, item_id: ItemId) -> Result<Node> {
        self.select_one(&Field::new("item_id", item_id))?
            .ok_or_else(|| Error::ElementNotFound {
                kind: ItemKind::Node.to_string(),
                field: "item_id".to_string(),
                value: item_id.to_string(),
            })
    }

    fn select_one(&self, predicate: &Field) -> Result<Option<Node>> {
        let rs = self.storage.equality_select(
            NODE_TABLE,
            &Projection::All,
            std::slice::from_ref(predicate),
        )?;
        rs.current().map(|row| self.node_from_row(row)).transpose()
    }

    fn node_from_row(&self, row: &Row) -> Result<Node> {
        let id = ItemId::new(row.get_long("item_id")?);
        let record = self.items.retrieve_from_database(id)?;
        Ok(Node::new(
            id,
            row.get_string("name")?,
            row.get_string("source_key")?,
            record.tags,
        ))
    }
}

impl ItemFactory for NodeFactory {
    type Item = Node;
    const KIND: ItemKind = ItemKind::Node;

    fn find(&self, source_key: &str) -> Result<Option<Node>> {
        self.select_one(&Field::new("source_key", source_key))
    }

    fn update(&self, item_id: ItemId, child: VersionId, parent_ids: &[VersionId]) -> Result<()> {
        self.items.update(item_id, child, parent_ids)
    }

    fn truncate(&self, item_id: ItemId, num_levels: usize) -> Result<TruncationPlan> {
        self.items.truncate(item_id, num_levels, NODE_VERSION_TABLE)
    }
}

/// Creates and loads node versions.
pub struct NodeVersionFactory {
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    items: Arc<ItemStore>,
    nodes: Arc<NodeFactory>,
}

impl NodeVersionFactory {
    /// Creates a new node version factory.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        ids: Arc<IdGenerator>,
        items: Arc<ItemStore>,
        nodes: Arc<NodeFactory>,
    ) -> Self {
        Self {
            storage,
            ids,
            items,
            nodes,
        }
    }

    /// Creates a version of `node_id` below `parent_ids`.
    ///
    /// Pass `[VersionId::NO_PARENT]` or an empty slice for a first version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] for an unknown node or a parent
    /// without a stored version, [`Error::InvalidInput`] for an unregistered
    /// parent, or a storage error. Parents are checked before anything is
    /// written.
    #[instrument(skip(self, tags), fields(node_id = %node_id))]
    pub fn create(
        &self,
        node_id: ItemId,
        reference: Option<&str>,
        tags: BTreeMap<String, Tag>,
        parent_ids: &[VersionId],
    ) -> Result<NodeVersion> {
        self.nodes.retrieve_by_id(node_id)?;
        let parents = real_parents(parent_ids);
        self.items
            .version_history()
            .verify_registered(node_id, &parents)?;
        for parent in &parents {
            let version = self.retrieve_from_database(*parent)?;
            if version.node_id != node_id {
                return Err(Error::InvalidInput(format!(
                    "version {parent} belongs to node {}, not {node_id}",
                    version.node_id
                )));
            }
        }

        let id = self.ids.generate_version_id()?;
        self.items.insert_tags(id.get(), &tags)?;
        self.storage.insert(
            NODE_VERSION_TABLE,
            &[
                Field::new("id", id),
                Field::new("node_id", node_id),
                Field::new("reference", reference),
            ],
        )?;
        self.nodes.update(node_id, id, parent_ids)?;

        tracing::debug!(node_id = %node_id, version_id = %id, "Created node version");
        Ok(NodeVersion {
            id,
            node_id,
            reference: reference.map(str::to_string),
            tags,
        })
    }

    /// Retrieves a node version by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if no node version has the id.
    pub fn retrieve_from_database(&self, id: VersionId) -> Result<NodeVersion> {
        let rs = self.storage.equality_select(
            NODE_VERSION_TABLE,
            &Projection::All,
            &[Field::new("id", id)],
        )?;
        if rs.is_empty() {
            return Err(Error::ElementNotFound {
                kind: NODE_VERSION_TABLE.to_string(),
                field: "id".to_string(),
                value: id.to_string(),
            });
        }

        Ok(NodeVersion {
            id,
            node_id: ItemId::new(rs.get_long("node_id")?),
            reference: rs.get_optional_string("reference")?,
            tags: self.items.retrieve_tags(id.get())?,
        })
    }
}
