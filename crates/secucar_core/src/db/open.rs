//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure the per-statement lock deadline.
//! - Trigger migrations and the schema check before returning a connection.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.
//! - Returned connections match the driver's table map.

use super::driver::verify_schema;
use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

pub(crate) const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file with the default busy timeout.
///
/// # Side effects
/// - Creates the file when missing and applies pending migrations.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// Opens a SQLite database file, waiting at most `busy_timeout` per statement
/// for a storage lock.
pub fn open_db_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let conn = Connection::open(path).inspect_err(|err| {
        error!(
            "event=db_open module=db status=error mode=file duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
    })?;

    finish_open(conn, "file", busy_timeout, started_at)
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_in_memory_with_timeout(DEFAULT_BUSY_TIMEOUT)
}

/// In-memory variant of `open_db_with_timeout`.
pub fn open_db_in_memory_with_timeout(busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let conn = Connection::open_in_memory().inspect_err(|err| {
        error!(
            "event=db_open module=db status=error mode=memory duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
    })?;

    finish_open(conn, "memory", busy_timeout, started_at)
}

fn finish_open(
    mut conn: Connection,
    mode: &str,
    busy_timeout: Duration,
    started_at: Instant,
) -> DbResult<Connection> {
    match bootstrap_connection(&mut conn, busy_timeout) {
        Ok(migrations_applied) => {
            info!(
                "event=db_open module=db status=ok mode={} migrations_applied={} duration_ms={}",
                mode,
                migrations_applied,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, busy_timeout: Duration) -> DbResult<usize> {
    conn.busy_timeout(busy_timeout)?;
    let applied = apply_migrations(conn)?;
    verify_schema(conn)?;
    Ok(applied)
}
