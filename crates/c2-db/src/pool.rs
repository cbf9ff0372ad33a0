//! Pooled SQLite connections for the event store.
//!
//! File databases run in WAL mode so `GET /events` readers never block the
//! single writer inserting new events. Every connection carries the same busy
//! timeout, and pool checkout uses it too, so one storage call has one
//! deadline whether it waits for a connection or for the write lock.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use thiserror::Error;

const IN_MEMORY: &str = ":memory:";

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a storage call may wait on a locked database or an exhausted
    /// pool, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,
}

impl DbRuntimeSettings {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.max(1))
    }
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The runtime settings cannot produce a usable pool.
    #[error("invalid database settings: {0}")]
    InvalidSettings(&'static str),

    /// Opening or configuring the initial connections failed.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Creates the connection pool for the event store.
///
/// `db_path` may be `:memory:`. An in-memory database exists per
/// connection, so such a pool is capped at a single connection to keep one
/// shared store.
///
/// # Errors
///
/// Returns `PoolError::InvalidSettings` for a zero pool size and
/// `PoolError::PoolInit` if the database cannot be opened or WAL cannot be
/// enabled.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    if settings.pool_max_size == 0 {
        return Err(PoolError::InvalidSettings("pool_max_size must be at least 1"));
    }

    let (manager, max_size) = if db_path == IN_MEMORY {
        (SqliteConnectionManager::memory(), 1)
    } else {
        (SqliteConnectionManager::file(db_path), settings.pool_max_size)
    };

    let busy_timeout = settings.busy_timeout();
    let manager = manager.with_init(move |conn| configure_connection(conn, busy_timeout));

    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(busy_timeout)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        max_size,
        busy_timeout_ms = settings.busy_timeout_ms,
        "database pool ready"
    );

    Ok(pool)
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;

    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") && !mode.eq_ignore_ascii_case("memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            Some(format!("journal_mode stayed {mode}, WAL is required")),
        ));
    }

    Ok(())
}
