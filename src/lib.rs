//! # Vercat
//!
//! A versioned metadata catalog.
//!
//! Items (nodes and edges) accrue an append-only, branchable history of
//! immutable versions. Every item owns a version-history DAG recording the
//! lineage of its versions, and every edge version carries two endpoint
//! intervals tying it to the lineages of the two nodes it connects.
//!
//! ## Features
//!
//! - Generic item lifecycle (create, retrieve, update, truncate) shared by all item kinds
//! - Per-item version-history DAG with merge and branch lineage
//! - Edge endpoint interval closing as new edge versions are linked
//! - Pluggable storage backends (in-memory, `SQLite`) behind one narrow contract
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::collections::BTreeMap;
//! use vercat::Catalog;
//!
//! let catalog = Catalog::in_memory();
//! let from = catalog.nodes().create("a", "node-a", BTreeMap::new())?;
//! let to = catalog.nodes().create("b", "node-b", BTreeMap::new())?;
//! let edge = catalog
//!     .edges()
//!     .create("a-to-b", "edge-a-b", from.id, to.id, BTreeMap::new())?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{CatalogConfig, StorageBackendType};
pub use models::{
    Edge, EdgeVersion, ItemId, ItemKind, Node, NodeVersion, Tag, TagValue, VersionHistoryDag,
    VersionId,
};
pub use services::{
    Catalog, EdgeFactory, EdgeVersionFactory, IdGenerator, ItemFactory, ItemStore, NodeFactory,
    NodeVersionFactory, VersionHistoryStore,
};
pub use storage::{InMemoryStorage, SqliteStorage, StorageBackend};

/// Error type for catalog operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `ItemNotFound` | No item of a kind has the requested source key |
/// | `ElementNotFound` | A lookup by an arbitrary field yields no row |
/// | `ItemAlreadyExists` | `create` is called with a source key already in use |
/// | `ElementAlreadyExists` | A uniqueness check without an identity key fails |
/// | `StorageFailure` | The storage backend reports an error |
/// | `InvalidInput` | Sentinel parents, unknown columns, invalid truncation depth |
/// | `OperationFailed` | Configuration or logging setup fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// No item of the given kind has the given source key.
    #[error("item of type [{kind}] with sourceKey [{source_key}] not found")]
    ItemNotFound {
        /// Item kind that was looked up.
        kind: String,
        /// The missing source key.
        source_key: String,
    },

    /// A lookup by field and value yielded no row.
    #[error("item of type [{kind}] with field [{field}] having value [{value}] not found")]
    ElementNotFound {
        /// Item or version kind that was looked up.
        kind: String,
        /// Column used for the lookup.
        field: String,
        /// Rendered lookup value.
        value: String,
    },

    /// An item of the given kind already uses the given source key.
    #[error("item of type [{kind}] with id [{source_key}] already exists")]
    ItemAlreadyExists {
        /// Item kind.
        kind: String,
        /// The conflicting source key.
        source_key: String,
    },

    /// A uniqueness check failed without an identity key.
    #[error("item of type [{kind}] already exists")]
    ElementAlreadyExists {
        /// Item kind.
        kind: String,
    },

    /// The storage backend failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail to prepare or execute
    /// - A backend lock cannot be used
    /// - A typed getter finds a value of another type
    #[error("storage operation '{operation}' failed: {cause}")]
    StorageFailure {
        /// The storage operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A sentinel parent id reaches the DAG
    /// - A DAG edge references an unregistered version
    /// - A table or column is not part of the schema
    /// - Truncation is asked to keep zero levels
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A non-storage operation failed.
    ///
    /// Raised when:
    /// - The configuration file cannot be read or parsed
    /// - Logging is initialized twice
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns `true` for both not-found variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound { .. } | Self::ElementNotFound { .. })
    }

    /// Returns `true` for both already-exists variants.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::ItemAlreadyExists { .. } | Self::ElementAlreadyExists { .. }
        )
    }

    pub(crate) fn storage(operation: &str, cause: impl ToString) -> Self {
        Self::StorageFailure {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;
