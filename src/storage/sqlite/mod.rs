//! `SQLite` storage backend.
//!
//! Implements [`StorageBackend`] on an embedded `SQLite` database. Tables and
//! indexes are created from [`crate::storage::schema`] when the backend
//! opens; sequences live in their own table and are incremented with a
//! single `INSERT ... ON CONFLICT ... RETURNING` statement, so they are
//! durable and atomic.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition with poison recovery, pragmas
//! - [`sql`]: statement construction from schema declarations
//! - [`metrics`]: per-operation counters and latency histograms

mod connection;
mod metrics;
mod sql;

pub use connection::{BUSY_TIMEOUT_MS, acquire_lock, configure_connection};
pub use metrics::record_operation_metrics;

use crate::storage::schema::{self, ColumnDef, TABLES};
use crate::storage::traits::{StorageBackend, require_predicates};
use crate::storage::value::{DataType, Field, Projection, ResultSet, Row, Value};
use crate::{Error, Result};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql, params, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Self::Long(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*v)),
            Self::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Self::Boolean(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*v))),
        })
    }
}

/// `SQLite`-based storage backend.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. WAL mode and
/// `busy_timeout` handle access from other processes gracefully.
pub struct SqliteStorage {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Opens (or creates) a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::storage("create_sqlite_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::storage("open_sqlite", e))?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        backend.initialize()?;
        Ok(backend)
    }

    /// Creates an in-memory `SQLite` database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::storage("open_sqlite_memory", e))?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };

        backend.initialize()?;
        Ok(backend)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Creates every schema table, its indexes and the sequence table.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        for table in TABLES {
            conn.execute(&sql::create_table(table), [])
                .map_err(|e| Error::storage("create_table", format!("{}: {e}", table.name)))?;
            for statement in sql::create_indexes(table) {
                conn.execute(&statement, [])
                    .map_err(|e| Error::storage("create_index", e))?;
            }
        }
        conn.execute(&sql::create_sequence_table(), [])
            .map_err(|e| Error::storage("create_sequence_table", e))?;

        tracing::debug!(path = ?self.db_path, tables = TABLES.len(), "SQLite catalog schema ready");
        Ok(())
    }

    /// Decodes one column according to its declaration.
    fn decode(column: &ColumnDef, value: ValueRef<'_>) -> Result<Value> {
        match (value, column.data_type) {
            (ValueRef::Null, _) => Ok(Value::Null),
            (ValueRef::Integer(v), DataType::Long) => Ok(Value::Long(v)),
            (ValueRef::Integer(v), DataType::Boolean) => Ok(Value::Boolean(v != 0)),
            (ValueRef::Text(bytes), DataType::String) => std::str::from_utf8(bytes)
                .map(|s| Value::String(s.to_string()))
                .map_err(|e| Error::storage("decode_column", e)),
            (other, expected) => Err(Error::storage(
                "decode_column",
                format!(
                    "column '{}' expected {expected}, found {:?}",
                    column.name,
                    other.data_type()
                ),
            )),
        }
    }

    fn timed<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = f();
        record_operation_metrics("sqlite", operation, start, metrics::status_of(&result));
        result
    }
}

impl StorageBackend for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    #[instrument(skip(self, fields), fields(table = %table))]
    fn insert(&self, table: &str, fields: &[Field]) -> Result<()> {
        Self::timed("insert", || {
            let def = schema::table(table)?;
            def.validate_insert(fields)?;

            let conn = acquire_lock(&self.conn);
            conn.execute(
                &sql::insert(def, fields),
                params_from_iter(fields.iter().map(|f| &f.value)),
            )
            .map_err(|e| Error::storage("insert", e))?;
            Ok(())
        })
    }

    #[instrument(skip(self, projection, predicates), fields(table = %table))]
    fn equality_select(
        &self,
        table: &str,
        projection: &Projection,
        predicates: &[Field],
    ) -> Result<ResultSet> {
        Self::timed("equality_select", || {
            let def = schema::table(table)?;
            def.validate_fields(predicates)?;
            let columns = def.resolve_projection(projection)?;

            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare(&sql::select(def, &columns, predicates))
                .map_err(|e| Error::storage("prepare_select", e))?;
            let mut rows = stmt
                .query(params_from_iter(predicates.iter().map(|p| &p.value)))
                .map_err(|e| Error::storage("equality_select", e))?;

            let mut result = Vec::new();
            while let Some(row) = rows.next().map_err(|e| Error::storage("read_row", e))? {
                let mut values = Vec::with_capacity(columns.len());
                for (idx, column) in columns.iter().enumerate() {
                    let raw = row
                        .get_ref(idx)
                        .map_err(|e| Error::storage("read_column", e))?;
                    values.push((column.name.to_string(), Self::decode(column, raw)?));
                }
                result.push(Row::new(values));
            }
            Ok(ResultSet::new(result))
        })
    }

    #[instrument(skip(self, assignments, predicates), fields(table = %table))]
    fn update(&self, table: &str, assignments: &[Field], predicates: &[Field]) -> Result<usize> {
        Self::timed("update", || {
            require_predicates("update", predicates)?;
            let def = schema::table(table)?;
            def.validate_fields(assignments)?;
            def.validate_fields(predicates)?;
            if assignments.is_empty() {
                return Ok(0);
            }

            let conn = acquire_lock(&self.conn);
            conn.execute(
                &sql::update(def, assignments, predicates),
                params_from_iter(assignments.iter().chain(predicates).map(|f| &f.value)),
            )
            .map_err(|e| Error::storage("update", e))
        })
    }

    #[instrument(skip(self, predicates), fields(table = %table))]
    fn delete(&self, table: &str, predicates: &[Field]) -> Result<usize> {
        Self::timed("delete", || {
            require_predicates("delete", predicates)?;
            let def = schema::table(table)?;
            def.validate_fields(predicates)?;

            let conn = acquire_lock(&self.conn);
            conn.execute(
                &sql::delete(def, predicates),
                params_from_iter(predicates.iter().map(|p| &p.value)),
            )
            .map_err(|e| Error::storage("delete", e))
        })
    }

    #[instrument(skip(self))]
    fn next_sequence_value(&self, name: &str) -> Result<i64> {
        Self::timed("next_sequence_value", || {
            let conn = acquire_lock(&self.conn);
            conn.query_row(&sql::next_sequence_value(), params![name], |row| row.get(0))
                .map_err(|e| Error::storage("next_sequence_value", e))
        })
    }
}
