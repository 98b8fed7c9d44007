//! In-memory storage backend.
//!
//! Provides a fast, non-persistent implementation of [`StorageBackend`] for
//! use in unit tests and embedded scenarios.

use crate::storage::schema::{self, TableDef};
use crate::storage::traits::{StorageBackend, require_predicates};
use crate::storage::value::{Field, Projection, ResultSet, Row, Value};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// In-memory storage backend.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Rows keep insertion order. Data is not persisted between runs.
///
/// # Example
///
/// ```rust
/// use vercat::storage::{InMemoryStorage, StorageBackend};
/// use vercat::storage::value::{Field, Projection};
///
/// let storage = InMemoryStorage::new();
/// storage.insert("item", &[Field::new("item_id", 1_i64), Field::new("kind", "node")])?;
/// let rows = storage.equality_select("item", &Projection::All, &[Field::new("item_id", 1_i64)])?;
/// assert_eq!(rows.get_string("kind")?, "node");
/// # Ok::<(), vercat::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<HashMap<&'static str, Vec<Row>>>,
    sequences: Mutex<HashMap<String, i64>>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows stored in a table.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Builds a full row in schema order; missing nullable columns become `NULL`.
    fn build_row(table: &TableDef, fields: &[Field]) -> Row {
        Row::new(
            table
                .columns
                .iter()
                .map(|c| {
                    let value = fields
                        .iter()
                        .rev()
                        .find(|f| f.column == c.name)
                        .map_or(Value::Null, |f| f.value.clone());
                    (c.name.to_string(), value)
                })
                .collect(),
        )
    }

    fn poisoned(operation: &str) -> Error {
        Error::StorageFailure {
            operation: operation.to_string(),
            cause: "Lock poisoned".to_string(),
        }
    }
}

impl StorageBackend for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn insert(&self, table: &str, fields: &[Field]) -> Result<()> {
        let def = schema::table(table)?;
        def.validate_insert(fields)?;

        let mut tables = self.tables.write().map_err(|_| Self::poisoned("insert"))?;
        tables
            .entry(def.name)
            .or_default()
            .push(Self::build_row(def, fields));
        Ok(())
    }

    fn equality_select(
        &self,
        table: &str,
        projection: &Projection,
        predicates: &[Field],
    ) -> Result<ResultSet> {
        let def = schema::table(table)?;
        def.validate_fields(predicates)?;
        def.resolve_projection(projection)?;

        let tables = self
            .tables
            .read()
            .map_err(|_| Self::poisoned("equality_select"))?;

        let rows = tables
            .get(def.name)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.matches(predicates))
                    .map(|r| r.project(projection))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ResultSet::new(rows))
    }

    fn update(&self, table: &str, assignments: &[Field], predicates: &[Field]) -> Result<usize> {
        require_predicates("update", predicates)?;
        let def = schema::table(table)?;
        def.validate_fields(assignments)?;
        def.validate_fields(predicates)?;

        let mut tables = self.tables.write().map_err(|_| Self::poisoned("update"))?;
        let Some(rows) = tables.get_mut(def.name) else {
            return Ok(0);
        };

        let mut changed = 0;
        for row in rows.iter_mut().filter(|r| r.matches(predicates)) {
            for assignment in assignments {
                row.set(&assignment.column, assignment.value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    fn delete(&self, table: &str, predicates: &[Field]) -> Result<usize> {
        require_predicates("delete", predicates)?;
        let def = schema::table(table)?;
        def.validate_fields(predicates)?;

        let mut tables = self.tables.write().map_err(|_| Self::poisoned("delete"))?;
        let Some(rows) = tables.get_mut(def.name) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|r| !r.matches(predicates));
        Ok(before - rows.len())
    }

    fn next_sequence_value(&self, name: &str) -> Result<i64> {
        let mut sequences = self
            .sequences
            .lock()
            .map_err(|_| Self::poisoned("next_sequence_value"))?;
        let value = sequences.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{EDGE_TABLE, TAG_TABLE};

    fn edge_fields(item_id: i64, source_key: &str) -> Vec<Field> {
        vec![
            Field::new("name", "e"),
            Field::new("item_id", item_id),
            Field::new("from_node_id", 10_i64),
            Field::new("to_node_id", 20_i64),
            Field::new("source_key", source_key),
        ]
    }

    #[test]
    fn test_insert_and_select() {
        let storage = InMemoryStorage::new();
        storage.insert(EDGE_TABLE, &edge_fields(1, "e1")).unwrap();
        storage.insert(EDGE_TABLE, &edge_fields(2, "e2")).unwrap();

        let rs = storage
            .equality_select(EDGE_TABLE, &Projection::All, &[Field::new("source_key", "e2")])
            .unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get_long("item_id").unwrap(), 2);
        assert_eq!(storage.row_count(EDGE_TABLE), 2);
    }

    #[test]
    fn test_missing_nullable_column_is_null() {
        let storage = InMemoryStorage::new();
        storage
            .insert(TAG_TABLE, &[Field::new("owner_id", 1_i64), Field::new("key", "k")])
            .unwrap();
        let rs = storage
            .equality_select(TAG_TABLE, &Projection::All, &[])
            .unwrap();
        assert_eq!(rs.get_optional_string("value").unwrap(), None);
    }

    #[test]
    fn test_update_and_delete() {
        let storage = InMemoryStorage::new();
        storage.insert(EDGE_TABLE, &edge_fields(1, "e1")).unwrap();

        let changed = storage
            .update(
                EDGE_TABLE,
                &[Field::new("name", "renamed")],
                &[Field::new("item_id", 1_i64)],
            )
            .unwrap();
        assert_eq!(changed, 1);

        let rs = storage
            .equality_select(EDGE_TABLE, &Projection::columns(["name"]), &[])
            .unwrap();
        assert_eq!(rs.get_string("name").unwrap(), "renamed");

        assert_eq!(storage.delete(EDGE_TABLE, &[Field::new("item_id", 1_i64)]).unwrap(), 1);
        assert!(!storage.exists(EDGE_TABLE, &[]).unwrap());
    }

    #[test]
    fn test_unconditional_delete_rejected() {
        let storage = InMemoryStorage::new();
        assert!(matches!(
            storage.delete(EDGE_TABLE, &[]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sequences_are_independent() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.next_sequence_value("a").unwrap(), 1);
        assert_eq!(storage.next_sequence_value("a").unwrap(), 2);
        assert_eq!(storage.next_sequence_value("b").unwrap(), 1);
    }
}
