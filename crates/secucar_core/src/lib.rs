//! Persistence core for the SecuCar vehicle-tracking backend.
//! Stores users, their devices, device tracks and track samples.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DatabaseConfig, StorageLocation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::device::Device;
pub use model::record::{Record, RecordId, RecordKind, SENTINEL_ID, UNASSIGNED_ID};
pub use model::sample::Sample;
pub use model::track::{NewTrack, Track, TrackEnd};
pub use model::user::{User, UserProfile};
pub use repo::{
    DeviceRepository, RepoError, RepoResult, SampleRepository, SqliteDeviceRepository,
    SqliteSampleRepository, SqliteTrackRepository, SqliteUserRepository, TrackRepository,
    UserRepository,
};
pub use service::database::Database;
pub use service::error::{DatabaseError, DatabaseResult, ErrorKind, StartupError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
