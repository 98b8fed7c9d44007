//! Storage layer abstraction.
//!
//! The catalog persists everything through the narrow [`StorageBackend`]
//! contract: typed rows in statically declared tables ([`schema`]), equality
//! selects returning a [`value::ResultSet`] cursor, and durable counters.
//!
//! | Backend | Module |
//! |---------|--------|
//! | [`InMemoryStorage`] | [`memory`] |
//! | [`SqliteStorage`] | [`sqlite`] |

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod value;

pub use memory::InMemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::StorageBackend;
