//! Typed repositories over the generic query driver.
//!
//! # Responsibility
//! - Translate typed records into driver calls, one repository per table.
//! - Parse positional rows back into records.
//! - Map storage failures to semantic errors (`NotFound`, `Conflict`).
//!
//! # Invariants
//! - Repositories never cascade deletes across tables.
//! - Rows that fail positional parsing are treated as absent.
//! - Update/delete touching zero rows report `NotFound`.

pub mod device_repo;
mod record_store;
pub mod sample_repo;
pub mod track_repo;
pub mod user_repo;

use crate::db::DriverError;
use crate::model::record::{RecordId, RecordKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use device_repo::{DeviceRepository, SqliteDeviceRepository};
pub use sample_repo::{SampleRepository, SqliteSampleRepository};
pub use track_repo::{SqliteTrackRepository, TrackRepository};
pub use user_repo::{SqliteUserRepository, UserRepository};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all record repositories.
#[derive(Debug)]
pub enum RepoError {
    /// No row with this identity exists.
    NotFound { kind: RecordKind, id: RecordId },
    /// A storage constraint rejected the write (e.g. duplicate username).
    Conflict(String),
    /// Statement building or execution failed.
    Driver(DriverError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Conflict(message) => write!(f, "storage constraint violated: {message}"),
            Self::Driver(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Driver(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::Conflict(_) => None,
        }
    }
}

impl From<DriverError> for RepoError {
    fn from(value: DriverError) -> Self {
        match value {
            DriverError::Db(err) if err.is_constraint_violation() => {
                Self::Conflict(err.to_string())
            }
            other => Self::Driver(other),
        }
    }
}
