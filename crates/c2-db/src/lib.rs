//! Storage engine plumbing for the c2 ingestion service.
//!
//! Provides the SQLite connection pool shared by request handlers and the
//! embedded migrations that create the `events` table used by `c2-events`.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: listings read concurrently with the single
//!   writer, which fits an insert-heavy, list-occasionally workload.
//! - **One deadline per storage call**: the busy timeout bounds both pool
//!   checkout and waiting on the write lock.
//! - **`user_version` schema tracking**: the migration state is a single
//!   header field, so the database holds no bookkeeping tables.

mod migrations;
mod pool;

pub use migrations::{run_migrations, schema_version, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
