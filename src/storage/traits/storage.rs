//! Storage backend trait for the catalog.
//!
//! The storage contract is deliberately narrow: row inserts, conjunctive
//! equality selects returning a typed cursor, updates and deletes by the
//! same predicates, and a durable counter. The item lifecycle and the
//! version-history DAG depend only on this trait, so swapping backends
//! requires no change above the storage layer.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | `SqliteStorage` | Default; embedded | WAL mode, durable sequences |
//! | `InMemoryStorage` | Testing | Fast, no persistence |
//!
//! # Error Modes and Guarantees
//!
//! All backends return `Result<T>` with errors propagated via [`crate::Error`]:
//!
//! - unknown tables, unknown columns and mistyped values fail with
//!   [`crate::Error::InvalidInput`] before storage is touched;
//! - backend failures surface as [`crate::Error::StorageFailure`], unmodified;
//! - no operation retries internally.
//!
//! Each call is atomic on its own. Sequences of calls are not.

use crate::Result;
use crate::storage::value::{Field, Projection, ResultSet};

/// Trait for catalog storage backends.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn StorageBackend>`
/// - Use interior mutability (e.g., `Mutex<Connection>`) for mutable state
/// - Validate tables and fields against [`crate::storage::schema`]
/// - Return rows in insertion order
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not fit the schema or the write fails.
    fn insert(&self, table: &str, fields: &[Field]) -> Result<()>;

    /// Selects rows where every predicate column equals its value.
    ///
    /// An empty predicate list selects every row. A
    /// [`Value::Null`](crate::storage::value::Value::Null) predicate matches
    /// rows whose column is null.
    ///
    /// # Errors
    ///
    /// Returns an error if the query does not fit the schema or the read fails.
    fn equality_select(
        &self,
        table: &str,
        projection: &Projection,
        predicates: &[Field],
    ) -> Result<ResultSet>;

    /// Sets `assignments` on every row matching `predicates`.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if `predicates` is empty, the update does not fit the
    /// schema or the write fails.
    fn update(&self, table: &str, assignments: &[Field], predicates: &[Field]) -> Result<usize>;

    /// Deletes every row matching `predicates`.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if `predicates` is empty, does not fit the schema or
    /// the write fails.
    fn delete(&self, table: &str, predicates: &[Field]) -> Result<usize>;

    /// Atomically increments and returns the named counter.
    ///
    /// The first value of a counter is `1`. Values are never reissued, also
    /// across restarts for durable backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read or written.
    fn next_sequence_value(&self, name: &str) -> Result<i64>;

    /// Returns `true` if at least one row matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the select fails.
    fn exists(&self, table: &str, predicates: &[Field]) -> Result<bool> {
        Ok(!self
            .equality_select(table, &Projection::All, predicates)?
            .is_empty())
    }
}

/// Rejects unconditional updates and deletes.
pub(crate) fn require_predicates(operation: &str, predicates: &[Field]) -> Result<()> {
    if predicates.is_empty() {
        return Err(crate::Error::InvalidInput(format!(
            "{operation} requires at least one predicate"
        )));
    }
    Ok(())
}
