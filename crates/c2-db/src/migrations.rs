//! Embedded schema migrations.
//!
//! The applied schema version lives in SQLite's `user_version` header field:
//! migration `n` (counting from 1) moves the database from version `n - 1` to
//! `n`. A step and its version bump commit in one transaction, so a failure
//! leaves the previous schema and version untouched.

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Append only; never edit a released step.
const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_events",
    sql: include_str!("migrations/001_events.sql"),
}];

/// Errors that can occur while migrating the schema.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A migration step failed and was rolled back.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: &'static str,
        source: rusqlite::Error,
    },

    /// The schema version could not be read.
    #[error("failed to read schema version: {0}")]
    VersionQuery(#[source] rusqlite::Error),

    /// The database was migrated by a newer build.
    #[error("schema version {found} is not supported (latest known is {latest})")]
    UnsupportedVersion { found: i64, latest: usize },
}

/// Returns the schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> Result<i64, MigrationError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(MigrationError::VersionQuery)
}

/// Brings the schema up to date and returns how many steps were applied.
///
/// # Errors
///
/// Returns `MigrationError::UnsupportedVersion` without touching the
/// database if it is ahead of this build, and
/// `MigrationError::ExecutionFailed` if a step fails.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    let found = schema_version(conn)?;
    let current = usize::try_from(found)
        .ok()
        .filter(|version| *version <= migrations.len())
        .ok_or(MigrationError::UnsupportedVersion {
            found,
            latest: migrations.len(),
        })?;

    for (index, migration) in migrations.iter().enumerate().skip(current) {
        let version = index as i64 + 1;
        let failed = |source| MigrationError::ExecutionFailed {
            name: migration.name,
            source,
        };

        tracing::info!(migration = migration.name, version, "applying migration");

        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.pragma_update(None, "user_version", version)
            .map_err(failed)?;
        tx.commit().map_err(failed)?;
    }

    let applied = migrations.len() - current;
    if applied == 0 {
        tracing::debug!(version = found, "schema up to date");
    }

    Ok(applied)
}
