//! Facade and startup error types.

use crate::config::ConfigError;
use crate::db::{DbError, DriverError};
use crate::model::record::{RecordId, RecordKind};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Coarse failure class exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    ValidationFailed,
    StorageUnavailable,
}

/// Failure of one facade operation.
#[derive(Debug)]
pub enum DatabaseError {
    /// Record with this identity does not exist.
    NotFound { kind: RecordKind, id: RecordId },
    /// No user is registered under this username.
    UnknownUsername(String),
    /// Supplied password hash differs from the stored one.
    PasswordMismatch,
    /// New password hash equals the old one.
    PasswordUnchanged,
    /// Storage constraint rejected the write.
    Conflict(String),
    /// Statement failed or the storage lock timed out.
    Storage(RepoError),
    /// The connection stayed locked by another caller past the deadline.
    LockTimeout { waited: Duration },
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::UnknownUsername(_) => ErrorKind::NotFound,
            Self::PasswordMismatch | Self::PasswordUnchanged => ErrorKind::ValidationFailed,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) | Self::LockTimeout { .. } => ErrorKind::StorageUnavailable,
        }
    }

    /// True when the call gave up waiting for the connection or storage lock.
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            Self::LockTimeout { .. } => true,
            Self::Storage(RepoError::Driver(DriverError::Db(err))) => err.is_busy(),
            _ => false,
        }
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::UnknownUsername(username) => write!(f, "no user with username `{username}`"),
            Self::PasswordMismatch => write!(f, "password hash mismatch"),
            Self::PasswordUnchanged => write!(f, "new password must differ from the old one"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
            Self::LockTimeout { waited } => {
                write!(f, "database connection still busy after {}ms", waited.as_millis())
            }
        }
    }
}

impl Error for DatabaseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DatabaseError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Storage(other),
        }
    }
}

impl From<DbError> for DatabaseError {
    fn from(value: DbError) -> Self {
        Self::from(RepoError::from(DriverError::Db(value)))
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

/// Boot failure; embedding callers decide whether to exit.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Logging(String),
    Open(DbError),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Open(err) => write!(f, "could not open the database: {err}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(_) => None,
            Self::Open(err) => Some(err),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for StartupError {
    fn from(value: DbError) -> Self {
        Self::Open(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{DatabaseError, ErrorKind};
    use crate::model::record::RecordKind;
    use crate::repo::RepoError;

    #[test]
    fn repo_errors_map_to_matching_kinds() {
        let not_found = DatabaseError::from(RepoError::NotFound {
            kind: RecordKind::Track,
            id: 9,
        });
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let conflict = DatabaseError::from(RepoError::Conflict("username".to_string()));
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn busy_sqlite_error_is_a_lock_timeout() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = DatabaseError::from(busy);
        assert!(err.is_lock_timeout());
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(!DatabaseError::PasswordMismatch.is_lock_timeout());
    }

    #[test]
    fn validation_failures_share_one_kind() {
        assert_eq!(
            DatabaseError::PasswordMismatch.kind(),
            ErrorKind::ValidationFailed
        );
        assert_eq!(
            DatabaseError::PasswordUnchanged.kind(),
            ErrorKind::ValidationFailed
        );
    }
}
