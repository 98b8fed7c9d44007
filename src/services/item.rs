//! Kind-independent item lifecycle.
//!
//! [`ItemStore`] owns the rows every item kind shares: the `item` row, the
//! tags of items and versions, and the version-history DAG. Kind-specific
//! factories implement [`ItemFactory`] on top of it.

use crate::models::{
    ItemId, ItemKind, ItemRecord, Tag, TagValue, TruncationPlan, VersionId, real_parents,
};
use crate::services::VersionHistoryStore;
use crate::storage::StorageBackend;
use crate::storage::schema::{ITEM_TABLE, TAG_TABLE};
use crate::storage::value::{Field, Projection};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Lifecycle operations shared by every item kind.
///
/// Implementors supply the kind, the lookup by source key and the
/// kind-specific update; existence checks derive from [`ItemFactory::find`].
pub trait ItemFactory {
    /// The item type produced by this factory.
    type Item;

    /// Kind of the items this factory manages.
    const KIND: ItemKind;

    /// Looks up an item by source key.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails. A missing item is `Ok(None)`.
    fn find(&self, source_key: &str) -> Result<Option<Self::Item>>;

    /// Retrieves an item by source key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if no item has the key.
    fn retrieve_from_database(&self, source_key: &str) -> Result<Self::Item> {
        self.find(source_key)?.ok_or_else(|| Error::ItemNotFound {
            kind: Self::KIND.to_string(),
            source_key: source_key.to_string(),
        })
    }

    /// Returns `true` if an item has the key.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    fn item_exists(&self, source_key: &str) -> Result<bool> {
        Ok(self.find(source_key)?.is_some())
    }

    /// Fails if an item already has the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemAlreadyExists`] if the key is taken.
    fn verify_item_not_exists(&self, source_key: &str) -> Result<()> {
        if self.item_exists(source_key)? {
            return Err(Error::ItemAlreadyExists {
                kind: Self::KIND.to_string(),
                source_key: source_key.to_string(),
            });
        }
        Ok(())
    }

    /// Attaches `child` to the item's history below `parent_ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent is unregistered or storage fails.
    fn update(&self, item_id: ItemId, child: VersionId, parent_ids: &[VersionId]) -> Result<()>;

    /// Keeps only the newest `num_levels` generations of the item's history.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_levels` is zero or storage fails.
    fn truncate(&self, item_id: ItemId, num_levels: usize) -> Result<TruncationPlan>;
}

/// Shared item, tag and history storage.
pub struct ItemStore {
    storage: Arc<dyn StorageBackend>,
    history: VersionHistoryStore,
}

impl ItemStore {
    /// Creates a new item store.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let history = VersionHistoryStore::new(Arc::clone(&storage));
        Self { storage, history }
    }

    /// The version-history store.
    #[must_use]
    pub const fn version_history(&self) -> &VersionHistoryStore {
        &self.history
    }

    /// Persists the shared `item` row and the item's tags.
    ///
    /// # Errors
    ///
    /// Returns an error if a write fails.
    #[instrument(skip(self, tags), fields(item_id = %id, kind = %kind))]
    pub fn insert_into_database(
        &self,
        id: ItemId,
        kind: ItemKind,
        tags: &BTreeMap<String, Tag>,
    ) -> Result<()> {
        self.storage.insert(
            ITEM_TABLE,
            &[Field::new("item_id", id), Field::new("kind", kind.as_str())],
        )?;
        self.insert_tags(id.get(), tags)
    }

    /// Retrieves the shared record of an item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if no item has the id.
    pub fn retrieve_from_database(&self, id: ItemId) -> Result<ItemRecord> {
        let rs = self.storage.equality_select(
            ITEM_TABLE,
            &Projection::All,
            &[Field::new("item_id", id)],
        )?;
        if rs.is_empty() {
            return Err(Error::ElementNotFound {
                kind: "item".to_string(),
                field: "item_id".to_string(),
                value: id.to_string(),
            });
        }

        let stored_kind = rs.get_string("kind")?;
        let kind = ItemKind::parse(&stored_kind).ok_or_else(|| {
            Error::storage("retrieve_item", format!("unknown item kind '{stored_kind}'"))
        })?;

        Ok(ItemRecord {
            id,
            kind,
            tags: self.retrieve_tags(id.get())?,
        })
    }

    /// Registers `child` and its lineage edges in the item's DAG.
    ///
    /// Sentinel parents are dropped; a child with no real parent is a root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a parent is not a registered version.
    #[instrument(skip(self), fields(item_id = %id, child = %child))]
    pub fn update(&self, id: ItemId, child: VersionId, parent_ids: &[VersionId]) -> Result<()> {
        let parents = real_parents(parent_ids);
        self.history.verify_registered(id, &parents)?;
        self.history.add_version(id, child)?;
        for parent in parents {
            self.history.add_edge(id, parent, child)?;
        }
        Ok(())
    }

    /// Truncates the item's history, removing pruned rows from `version_table`.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_levels` is zero or storage fails.
    pub fn truncate(
        &self,
        id: ItemId,
        num_levels: usize,
        version_table: &str,
    ) -> Result<TruncationPlan> {
        self.history.truncate(id, num_levels, version_table)
    }

    /// Writes one tag row per tag of `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be encoded or a write fails.
    pub fn insert_tags(&self, owner_id: i64, tags: &BTreeMap<String, Tag>) -> Result<()> {
        for tag in tags.values() {
            let value = tag
                .value
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| Error::storage("encode_tag", e))?;
            self.storage.insert(
                TAG_TABLE,
                &[
                    Field::new("owner_id", owner_id),
                    Field::new("key", tag.key.as_str()),
                    Field::new("value", value),
                ],
            )?;
        }
        Ok(())
    }

    /// Reads the tags of `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a select fails or a stored value cannot be decoded.
    pub fn retrieve_tags(&self, owner_id: i64) -> Result<BTreeMap<String, Tag>> {
        let rs = self.storage.equality_select(
            TAG_TABLE,
            &Projection::columns(["key", "value"]),
            &[Field::new("owner_id", owner_id)],
        )?;

        let mut tags = BTreeMap::new();
        for row in rs.rows() {
            let key = row.get_string("key")?;
            let value = row
                .get_optional_string("value")?
                .map(|raw| serde_json::from_str::<TagValue>(&raw))
                .transpose()
                .map_err(|e| Error::storage("decode_tag", e))?;
            tags.insert(key.clone(), Tag { key, value });
        }
        Ok(tags)
    }
}
