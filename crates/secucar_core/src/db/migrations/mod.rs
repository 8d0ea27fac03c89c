//! Embedded schema migrations for the tracking store.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per entry.
//! - Each migration commits together with its `PRAGMA user_version` bump, so
//!   an interrupted upgrade resumes from the last completed step.
//! - A database stamped with a version newer than this binary is refused.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "init_tracking_tables",
    sql: include_str!("0001_init.sql"),
}];

/// Newest schema version this binary can create.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Schema version stamped on the connection (`0` for a fresh database).
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Brings the schema up to `latest_version()`.
///
/// Returns how many migrations were applied; `0` when already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from = current_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|migration| migration.version > from) {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;

        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_version, latest_version, MIGRATIONS};
    use rusqlite::Connection;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1);
            assert!(!migration.name.is_empty());
        }
    }

    #[test]
    fn second_run_applies_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), MIGRATIONS.len());
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }
}
