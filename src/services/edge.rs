//! Edge items, edge versions and endpoint interval closing.
//!
//! Every edge version records, per endpoint, the interval of the endpoint
//! node's lineage during which it is the connector. An open end means the
//! version is still current on that branch. When a new edge version is
//! linked below a parent, the parent's open ends are closed at the node
//! version that displaced them.

use crate::models::{
    Edge, EdgeVersion, ItemId, ItemKind, LineageInterval, Tag, TruncationPlan,
    VersionHistoryDag, VersionId, real_parents,
};
use crate::services::{IdGenerator, ItemFactory, ItemStore};
use crate::storage::StorageBackend;
use crate::storage::schema::{EDGE_TABLE, EDGE_VERSION_TABLE};
use crate::storage::value::{Field, Projection, Row};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Endpoint of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    From,
    To,
}

impl Side {
    const fn as_str(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
        }
    }
}

/// Creates and loads edges, and links edge versions into their history.
pub struct EdgeFactory {
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    items: Arc<ItemStore>,
}

impl EdgeFactory {
    /// Creates a new edge factory.
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

    /// Creates an edge from `from_node_id` to `to_node_id`.
    ///
    /// The endpoints are fixed for the lifetime of the edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemAlreadyExists`] if the source key is taken, or a
    /// storage error.
    #[instrument(skip(self, tags), fields(from = %from_node_id, to = %to_node_id))]
    pub fn create(
        &self,
        name: &str,
        source_key: &str,
        from_node_id: ItemId,
        to_node_id: ItemId,
        tags: BTreeMap<String, Tag>,
    ) -> Result<Edge> {
        self.verify_item_not_exists(source_key)?;

        let id = self.ids.generate_item_id()?;
        self.items.insert_into_database(id, ItemKind::Edge, &tags)?;
        self.storage.insert(
            EDGE_TABLE,
            &[
                Field::new("name", name),
                Field::new("item_id", id),
                Field::new("from_node_id", from_node_id),
                Field::new("to_node_id", to_node_id),
                Field::new("source_key", source_key),
            ],
        )?;

        tracing::info!(item_id = %id, source_key, "Created edge");
        metrics::counter!("vercat_items_created_total", "kind" => "edge").increment(1);
        Ok(Edge::new(id, name, source_key, from_node_id, to_node_id, tags))
    }

    /// Retrieves an edge by item id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if no edge has the id.
    pub fn retrieve_by_id(&self, item_id: ItemId) -> Result<Edge> {
        self.select_one(&Field::new("item_id", item_id))?
            .ok_or_else(|| Error::ElementNotFound {
                kind: ItemKind::Edge.to_string(),
                field: "item_id".to_string(),
                value: item_id.to_string(),
            })
    }

    fn select_one(&self, predicate: &Field) -> Result<Option<Edge>> {
        let rs = self.storage.equality_select(
            EDGE_TABLE,
            &Projection::All,
            std::slice::from_ref(predicate),
        )?;
        rs.current().map(|row| self.edge_from_row(row)).transpose()
    }

    fn edge_from_row(&self, row: &Row) -> Result<Edge> {
        let id = ItemId::new(row.get_long("item_id")?);
        let record = self.items.retrieve_from_database(id)?;
        Ok(Edge::new(
            id,
            row.get_string("name")?,
            row.get_string("source_key")?,
            ItemId::new(row.get_long("from_node_id")?),
            ItemId::new(row.get_long("to_node_id")?),
            record.tags,
        ))
    }

    fn version_from_row(&self, row: &Row) -> Result<EdgeVersion> {
        let id = VersionId::new(row.get_long("id")?);
        Ok(EdgeVersion {
            id,
            edge_id: ItemId::new(row.get_long("edge_id")?),
            from_interval: LineageInterval::from_stored(
                row.get_long("from_node_version_start_id")?,
                row.get_long("from_node_version_end_id")?,
            ),
            to_interval: LineageInterval::from_stored(
                row.get_long("to_node_version_start_id")?,
                row.get_long("to_node_version_end_id")?,
            ),
            tags: self.items.retrieve_tags(id.get())?,
        })
    }

    fn load_version(&self, id: VersionId) -> Result<EdgeVersion> {
        let rs = self.storage.equality_select(
            EDGE_VERSION_TABLE,
            &Projection::All,
            &[Field::new("id", id)],
        )?;
        match rs.current() {
            Some(row) => self.version_from_row(row),
            None => Err(Error::ElementNotFound {
                kind: EDGE_VERSION_TABLE.to_string(),
                field: "id".to_string(),
                value: id.to_string(),
            }),
        }
    }

    fn load_versions_of(&self, edge_id: ItemId) -> Result<Vec<EdgeVersion>> {
        let rs = self.storage.equality_select(
            EDGE_VERSION_TABLE,
            &Projection::All,
            &[Field::new("edge_id", edge_id)],
        )?;
        rs.rows()
            .iter()
            .map(|row| self.version_from_row(row))
            .collect()
    }

    fn load_version_of(&self, edge_id: ItemId, id: VersionId) -> Result<EdgeVersion> {
        let version = self.load_version(id)?;
        if version.edge_id != edge_id {
            return Err(Error::InvalidInput(format!(
                "version {id} belongs to edge {}, not {edge_id}",
                version.edge_id
            )));
        }
        Ok(version)
    }

    /// Sets the given interval ends of an edge version; `None` leaves a side unchanged.
    fn close_intervals(
        &self,
        id: VersionId,
        from_end: Option<VersionId>,
        to_end: Option<VersionId>,
    ) -> Result<()> {
        let assignments: Vec<Field> = [
            from_end.map(|end| Field::new("from_node_version_end_id", end)),
            to_end.map(|end| Field::new("to_node_version_end_id", end)),
        ]
        .into_iter()
        .flatten()
        .collect();
        if assignments.is_empty() {
            return Ok(());
        }

        let changed =
            self.storage
                .update(EDGE_VERSION_TABLE, &assignments, &[Field::new("id", id)])?;
        if changed == 0 {
            return Err(Error::ElementNotFound {
                kind: EDGE_VERSION_TABLE.to_string(),
                field: "id".to_string(),
                value: id.to_string(),
            });
        }
        Ok(())
    }

    /// Finds the node version that displaced `start`'s predecessor: the
    /// first parent of `start` in the node's lineage.
    fn resolve_end(
        &self,
        history: &mut Option<VersionHistoryDag>,
        node_id: ItemId,
        start: VersionId,
        side: Side,
    ) -> Result<Option<VersionId>> {
        if history.is_none() {
            *history = Some(self.items.version_history().retrieve_from_database(node_id)?);
        }
        let end = history
            .as_ref()
            .and_then(|dag| dag.get_parent(start).first().copied());
        if end.is_none() {
            tracing::warn!(
                node_id = %node_id,
                start = %start,
                side = side.as_str(),
                "Node version has no parent; interval left open"
            );
        }
        Ok(end)
    }

    /// Returns the end to close on one side, or `None` to leave it unchanged.
    fn end_for_side(
        &self,
        side: Side,
        parent: &EdgeVersion,
        child: &EdgeVersion,
        node_id: ItemId,
        history: &mut Option<VersionHistoryDag>,
    ) -> Result<Option<VersionId>> {
        let (parent_interval, child_interval) = match side {
            Side::From => (parent.from_interval, child.from_interval),
            Side::To => (parent.to_interval, child.to_interval),
        };
        if !parent_interval.is_open() || parent_interval.start == child_interval.start {
            return Ok(None);
        }
        self.resolve_end(history, node_id, child_interval.start, side)
    }
}

impl ItemFactory for EdgeFactory {
    type Item = Edge;
    const KIND: ItemKind = ItemKind::Edge;

    fn find(&self, source_key: &str) -> Result<Option<Edge>> {
        self.select_one(&Field::new("source_key", source_key))
    }

    /// Links `child` below `parent_ids` and closes the parents' open ends.
    ///
    /// For each real parent, a side is closed when the parent is still open
    /// on it and the child starts at a different node version there. The
    /// parent's end becomes the first parent of the child's start in that
    /// node's lineage. A side whose node version has no parent stays open.
    #[instrument(skip(self, parent_ids), fields(item_id = %item_id, child = %child))]
    fn update(&self, item_id: ItemId, child: VersionId, parent_ids: &[VersionId]) -> Result<()> {
        let parents = real_parents(parent_ids);
        if parents.is_empty() {
            return self.items.update(item_id, child, parent_ids);
        }

        let edge = self.retrieve_by_id(item_id)?;
        let child_version = self.load_version_of(item_id, child)?;
        let parent_versions = parents
            .iter()
            .map(|p| self.load_version_of(item_id, *p))
            .collect::<Result<Vec<_>>>()?;

        self.items.update(item_id, child, &parents)?;

        let mut from_history = None;
        let mut to_history = None;
        for parent in &parent_versions {
            let from_end = self.end_for_side(
                Side::From,
                parent,
                &child_version,
                edge.from_node_id,
                &mut from_history,
            )?;
            let to_end = self.end_for_side(
                Side::To,
                parent,
                &child_version,
                edge.to_node_id,
                &mut to_history,
            )?;

            if from_end.is_some() || to_end.is_some() {
                self.close_intervals(parent.id, from_end, to_end)?;
                tracing::debug!(
                    parent = %parent.id,
                    from_end = ?from_end,
                    to_end = ?to_end,
                    "Closed edge version intervals"
                );
                for (side, end) in [(Side::From, from_end), (Side::To, to_end)] {
                    if end.is_some() {
                        metrics::counter!(
                            "vercat_edge_intervals_closed_total",
                            "side" => side.as_str()
                        )
                        .increment(1);
                    }
                }
            }
        }
        Ok(())
    }

    fn truncate(&self, item_id: ItemId, num_levels: usize) -> Result<TruncationPlan> {
        self.items.truncate(item_id, num_levels, EDGE_VERSION_TABLE)
    }
}

/// Creates and loads edge versions.
pub struct EdgeVersionFactory {
    storage: Arc<dyn StorageBackend>,
    ids: Arc<IdGenerator>,
    items: Arc<ItemStore>,
    edges: Arc<EdgeFactory>,
}

impl EdgeVersionFactory {
    /// Creates a new edge version factory.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        ids: Arc<IdGenerator>,
        items: Arc<ItemStore>,
        edges: Arc<EdgeFactory>,
    ) -> Self {
        Self {
            storage,
            ids,
            items,
            edges,
        }
    }

    /// Creates a version of `edge_id` below `parent_ids` and closes the
    /// parents' intervals it supersedes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] for an unknown edge or a parent
    /// without a stored version, [`Error::InvalidInput`] for an unregistered
    /// or foreign parent, or a storage error. Parents are checked before
    /// anything is written.
    #[instrument(skip(self, tags), fields(edge_id = %edge_id))]
    pub fn create(
        &self,
        edge_id: ItemId,
        from_interval: LineageInterval,
        to_interval: LineageInterval,
        tags: BTreeMap<String, Tag>,
        parent_ids: &[VersionId],
    ) -> Result<EdgeVersion> {
        self.edges.retrieve_by_id(edge_id)?;
        let parents = real_parents(parent_ids);
        self.items
            .version_history()
            .verify_registered(edge_id, &parents)?;
        for parent in &parents {
            self.edges.load_version_of(edge_id, *parent)?;
        }

        let id = self.ids.generate_version_id()?;
        self.items.insert_tags(id.get(), &tags)?;
        self.storage.insert(
            EDGE_VERSION_TABLE,
            &[
                Field::new("id", id),
                Field::new("edge_id", edge_id),
                Field::new("from_node_version_start_id", from_interval.start),
                Field::new("from_node_version_end_id", from_interval.stored_end()),
                Field::new("to_node_version_start_id", to_interval.start),
                Field::new("to_node_version_end_id", to_interval.stored_end()),
            ],
        )?;
        self.edges.update(edge_id, id, parent_ids)?;

        Ok(EdgeVersion {
            id,
            edge_id,
            from_interval,
            to_interval,
            tags,
        })
    }

    /// Retrieves an edge version by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if no edge version has the id.
    pub fn retrieve_from_database(&self, id: VersionId) -> Result<EdgeVersion> {
        self.edges.load_version(id)
    }

    /// Closes the interval ends of a superseded version.
    ///
    /// `None` leaves that side unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if no edge version has the id.
    pub fn update_previous_version(
        &self,
        id: VersionId,
        from_end: Option<VersionId>,
        to_end: Option<VersionId>,
    ) -> Result<()> {
        self.edges.close_intervals(id, from_end, to_end)
    }

    /// Versions of an edge still open on at least one side.
    ///
    /// # Errors
    ///
    /// Returns an error if a select fails.
    pub fn current_connectors(&self, edge_id: ItemId) -> Result<Vec<EdgeVersion>> {
        Ok(self
            .edges
            .load_versions_of(edge_id)?
            .into_iter()
            .filter(|v| v.is_open_from() || v.is_open_to())
            .collect())
    }

    /// The open version of an edge that started at exactly these node versions.
    ///
    /// A child that keeps its parent's starts leaves both open, so several
    /// versions can match; the earliest stored one is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a select fails.
    pub fn connector_between(
        &self,
        edge_id: ItemId,
        from_version: VersionId,
        to_version: VersionId,
    ) -> Result<Option<EdgeVersion>> {
        Ok(self
            .edges
            .load_versions_of(edge_id)?
            .into_iter()
            .find(|v| v.connects(from_version, to_version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tag_map;
    use crate::storage::InMemoryStorage;

    struct Fixture {
        items: Arc<ItemStore>,
        edges: Arc<EdgeFactory>,
        versions: EdgeVersionFactory,
    }

    fn fixture() -> Fixture {
        let storage: Arc<dyn StorageBackend> = Arc::new(InMemoryStorage::new());
        let ids = Arc::new(IdGenerator::local(1000));
        let items = Arc::new(ItemStore::new(Arc::clone(&storage)));
        let edges = Arc::new(EdgeFactory::new(
            Arc::clone(&storage),
            Arc::clone(&ids),
            Arc::clone(&items),
        ));
        let versions =
            EdgeVersionFactory::new(storage, ids, Arc::clone(&items), Arc::clone(&edges));
        Fixture {
            items,
            edges,
            versions,
        }
    }

    fn v(id: i64) -> VersionId {
        VersionId::new(id)
    }

    /// Registers a node lineage `a → b` for `node`.
    fn node_lineage(items: &ItemStore, node: ItemId, a: i64, b: i64) {
        items.update(node, v(a), &[]).unwrap();
        items.update(node, v(b), &[v(a)]).unwrap();
    }

    #[test]
    fn test_create_and_retrieve() {
        let f = fixture();
        let tags = tag_map([Tag::new("k", "v")]);
        let edge = f
            .edges
            .create("e", "e1", ItemId::new(10), ItemId::new(20), tags.clone())
            .unwrap();

        let found = f.edges.retrieve_from_database("e1").unwrap();
        assert_eq!(found, edge);
        assert_eq!(found.from_node_id, ItemId::new(10));
        assert_eq!(found.tags, tags);

        let err = f.edges.retrieve_from_database("missing").unwrap_err();
        assert!(matches!(err, Error::ItemNotFound { .. }));
    }

    #[test]
    fn test_closes_moved_side_only() {
        let f = fixture();
        let from = ItemId::new(10);
        let to = ItemId::new(20);
        node_lineage(&f.items, from, 55, 56);
        node_lineage(&f.items, to, 70, 71);
        let edge = f.edges.create("e", "e1", from, to, BTreeMap::new()).unwrap();

        let first = f
            .versions
            .create(
                edge.id,
                LineageInterval::open(v(55)),
                LineageInterval::open(v(70)),
                BTreeMap::new(),
                &[VersionId::NO_PARENT],
            )
            .unwrap();
        let second = f
            .versions
            .create(
                edge.id,
                LineageInterval::open(v(56)),
                LineageInterval::open(v(70)),
                BTreeMap::new(),
                &[first.id],
            )
            .unwrap();

        let closed = f.versions.retrieve_from_database(first.id).unwrap();
        assert_eq!(closed.from_node_version_end_id(), Some(v(55)));
        assert!(closed.is_open_to());

        let open = f.versions.current_connectors(edge.id).unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(
            f.versions
                .connector_between(edge.id, v(56), v(70))
                .unwrap()
                .map(|c| c.id),
            Some(second.id)
        );
    }

    #[test]
    fn test_closed_side_is_not_reclosed() {
        let f = fixture();
        let from = ItemId::new(10);
        node_lineage(&f.items, from, 55, 56);
        let edge = f
            .edges
            .create("e", "e1", from, ItemId::new(20), BTreeMap::new())
            .unwrap();

        let first = f
            .versions
            .create(
                edge.id,
                LineageInterval::between(v(55), v(40)),
                LineageInterval::open(v(70)),
                BTreeMap::new(),
                &[],
            )
            .unwrap();
        f.versions
            .create(
                edge.id,
                LineageInterval::open(v(56)),
                LineageInterval::open(v(70)),
                BTreeMap::new(),
                &[first.id],
            )
            .unwrap();

        let unchanged = f.versions.retrieve_from_database(first.id).unwrap();
        assert_eq!(unchanged.from_node_version_end_id(), Some(v(40)));
    }

    #[test]
    fn test_start_without_parent_stays_open() {
        let f = fixture();
        let edge = f
            .edges
            .create("e", "e1", ItemId::new(10), ItemId::new(20), BTreeMap::new())
            .unwrap();
        let first = f
            .versions
            .create(
                edge.id,
                LineageInterval::open(v(55)),
                LineageInterval::open(v(70)),
                BTreeMap::new(),
                &[],
            )
            .unwrap();
        f.versions
            .create(
                edge.id,
                LineageInterval::open(v(56)),
                LineageInterval::open(v(70)),
                BTreeMap::new(),
                &[first.id],
            )
            .unwrap();

        assert!(
            f.versions
                .retrieve_from_database(first.id)
                .unwrap()
                .is_open_from()
        );
    }

    #[test]
    fn test_update_previous_version_missing() {
        let f = fixture();
        assert!(
            f.versions
                .update_previous_version(v(1), Some(v(2)), None)
                .unwrap_err()
                .is_not_found()
        );
        f.versions.update_previous_version(v(1), None, None).unwrap();
    }

    #[test]
    fn test_parent_without_version_row_writes_nothing() {
        let f = fixture();
        let edge = f
            .edges
            .create("e", "e1", ItemId::new(10), ItemId::new(20), BTreeMap::new())
            .unwrap();
        f.items.update(edge.id, v(999), &[]).unwrap();

        let err = f
            .versions
            .create(
                edge.id,
                LineageInterval::open(v(1)),
                LineageInterval::open(v(2)),
                tag_map([Tag::label("draft")]),
                &[v(999)],
            )
            .unwrap_err();
        assert!(err.is_not_found());

        assert!(f.versions.current_connectors(edge.id).unwrap().is_empty());
        let dag = f
            .items
            .version_history()
            .retrieve_from_database(edge.id)
            .unwrap();
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn test_foreign_version_rejected() {
        let f = fixture();
        let a = f
            .edges
            .create("a", "a", ItemId::new(10), ItemId::new(20), BTreeMap::new())
            .unwrap();
        let b = f
            .edges
            .create("b", "b", ItemId::new(10), ItemId::new(20), BTreeMap::new())
            .unwrap();
        let va = f
            .versions
            .create(
                a.id,
                LineageInterval::open(v(1)),
                LineageInterval::open(v(2)),
                BTreeMap::new(),
                &[],
            )
            .unwrap();
        let vb = f
            .versions
            .create(
                b.id,
                LineageInterval::open(v(1)),
                LineageInterval::open(v(2)),
                BTreeMap::new(),
                &[],
            )
            .unwrap();

        assert!(matches!(
            f.edges.update(b.id, vb.id, &[va.id]),
            Err(Error::InvalidInput(_))
        ));
    }
}
