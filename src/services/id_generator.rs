//! Identifier allocation for items and versions.
//!
//! Items and versions draw from one shared counter, so an item id never
//! equals a version id. The first identifier issued is `1`; `0` stays free
//! for the "no parent" sentinel.

use crate::models::{ItemId, VersionId};
use crate::storage::StorageBackend;
use crate::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Name of the storage sequence backing persistent generators.
pub const ID_SEQUENCE: &str = "catalog_ids";

enum Source {
    Local(AtomicI64),
    Persistent(Arc<dyn StorageBackend>),
}

/// Thread-safe identifier generator shared by every factory.
pub struct IdGenerator {
    source: Source,
}

impl IdGenerator {
    /// Creates a process-local generator whose first id is `start`.
    ///
    /// Identifiers are not remembered across restarts; use
    /// [`IdGenerator::persistent`] with a durable backend for that.
    #[must_use]
    pub fn local(start: i64) -> Self {
        Self {
            source: Source::Local(AtomicI64::new(start.max(1))),
        }
    }

    /// Creates a generator backed by a storage sequence.
    #[must_use]
    pub fn persistent(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            source: Source::Persistent(storage),
        }
    }

    /// Returns `true` if identifiers survive a restart of the process.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        matches!(self.source, Source::Persistent(_))
    }

    fn next(&self) -> Result<i64> {
        match &self.source {
            Source::Local(counter) => Ok(counter.fetch_add(1, Ordering::SeqCst)),
            Source::Persistent(storage) => storage.next_sequence_value(ID_SEQUENCE),
        }
    }

    /// Allocates a new item identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing sequence cannot be advanced.
    pub fn generate_item_id(&self) -> Result<ItemId> {
        self.next().map(ItemId::new)
    }

    /// Allocates a new version identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing sequence cannot be advanced.
    pub fn generate_version_id(&self) -> Result<VersionId> {
        self.next().map(VersionId::new)
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.source {
            Source::Local(_) => "local",
            Source::Persistent(storage) => storage.backend_name(),
        };
        f.debug_struct("IdGenerator").field("source", &mode).finish()
    }
}
