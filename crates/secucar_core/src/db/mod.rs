//! SQLite storage bootstrap, schema migrations and the generic query driver.
//!
//! # Responsibility
//! - Open and configure the single SQLite connection used by the facade.
//! - Apply embedded schema migrations in deterministic order.
//! - Verify the live schema against the driver's table map before use.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No record is read or written before migrations and schema checks pass.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod driver;
pub mod migrations;
mod open;

pub use driver::{Criteria, DriverError, DriverResult, QueryDriver, SqlRow, Table};
pub(crate) use open::DEFAULT_BUSY_TIMEOUT;
pub use open::{open_db, open_db_in_memory, open_db_in_memory_with_timeout, open_db_with_timeout};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Live schema lacks a table or column the driver's table map declares.
    SchemaMismatch {
        table: &'static str,
        column: Option<&'static str>,
    },
}

impl DbError {
    /// Returns whether the underlying SQLite error is a busy/locked timeout.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }

    /// Returns whether the underlying SQLite error is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaMismatch {
                table,
                column: None,
            } => write!(f, "database is missing required table `{table}`"),
            Self::SchemaMismatch {
                table,
                column: Some(column),
            } => write!(
                f,
                "database is missing required column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
