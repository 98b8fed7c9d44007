//! Storage backend traits.

mod storage;

pub use storage::StorageBackend;
pub(crate) use storage::require_predicates;
