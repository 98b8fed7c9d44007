//! Shared connection handling for the `SQLite` backend.
//!
//! This module provides utilities for managing `SQLite` connections with proper
//! mutex handling, poison recovery, and performance configuration.

use crate::Result;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Busy timeout applied to every connection, in milliseconds.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// we recover the inner value and log a warning. This prevents cascading
/// failures when one operation panics.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("vercat_sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for concurrent catalog access.
///
/// # Configuration Applied
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: balances durability with performance
/// - **`busy_timeout`**: waits up to [`BUSY_TIMEOUT_MS`] for locks instead of failing
///
/// # Errors
///
/// Currently infallible; pragma failures are ignored because in-memory
/// databases reject WAL mode.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a row ("wal"), so the result is ignored rather than batched
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS);

    Ok(())
}
