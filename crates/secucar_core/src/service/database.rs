//! Database facade: the single entry point used by the transport layer.
//!
//! # Responsibility
//! - Own the one SQLite connection and serialize access to it.
//! - Expose user, device, track and sample operations by business name.
//!
//! # Invariants
//! - Every operation holds the connection lock for its whole duration.
//! - Waiting for the lock is bounded by the configured busy timeout.
//! - Read-modify-write operations run in one immediate transaction.
//! - Child records are only inserted under an existing parent.
//! - Deletes never cascade to child tables.

use crate::config::{DatabaseConfig, StorageLocation};
use crate::db::migrations::current_version;
use crate::db::{open_db_in_memory_with_timeout, open_db_with_timeout, DEFAULT_BUSY_TIMEOUT};
use crate::model::device::Device;
use crate::model::record::{Record, RecordId, RecordKind};
use crate::model::sample::Sample;
use crate::model::track::{NewTrack, Track, TrackEnd};
use crate::model::user::{User, UserProfile};
use crate::repo::{
    DeviceRepository, SampleRepository, SqliteDeviceRepository, SqliteSampleRepository,
    SqliteTrackRepository, SqliteUserRepository, TrackRepository, UserRepository,
};
use crate::service::error::{DatabaseError, DatabaseResult, StartupError};
use log::{debug, error};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, TransactionBehavior};
use std::time::Duration;

/// Facade over the four record repositories.
///
/// Construct once at startup and share by reference (or `Arc`).
pub struct Database {
    conn: Mutex<Connection>,
    /// Longest wait for the connection lock; also SQLite's busy timeout.
    lock_timeout: Duration,
}

impl Database {
    /// Opens the configured storage, applying migrations and schema checks.
    ///
    /// # Errors
    /// - Returns `StartupError::Open` when the storage cannot be opened; the
    ///   failure is logged with `severity=fatal`.
    pub fn open(config: &DatabaseConfig) -> Result<Self, StartupError> {
        let opened = match &config.storage {
            StorageLocation::File(path) => open_db_with_timeout(path, config.busy_timeout),
            StorageLocation::Memory => open_db_in_memory_with_timeout(config.busy_timeout),
        };

        match opened {
            Ok(conn) => {
                debug!("event=database_open module=service status=ok");
                Ok(Self::with_lock_timeout(conn, config.busy_timeout))
            }
            Err(err) => {
                error!(
                    "event=database_open module=service status=error severity=fatal error={}",
                    err
                );
                Err(StartupError::Open(err))
            }
        }
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self, StartupError> {
        Self::open(&DatabaseConfig::in_memory())
    }

    /// Wraps a connection already prepared by `db::open_db*`, waiting at most
    /// the default five seconds for the connection lock.
    pub fn from_connection(conn: Connection) -> Self {
        Self::with_lock_timeout(conn, DEFAULT_BUSY_TIMEOUT)
    }

    /// Wraps a prepared connection with an explicit lock deadline.
    pub fn with_lock_timeout(conn: Connection, lock_timeout: Duration) -> Self {
        Self {
            conn: Mutex::new(conn),
            lock_timeout,
        }
    }

    /// Returns the applied schema version.
    pub fn schema_version(&self) -> DatabaseResult<u32> {
        self.run("schema_version", |conn| Ok(current_version(conn)?))
    }

    // ---- users ----

    /// Returns the identity of the user when `password_hash` matches.
    pub fn login(&self, username: &str, password_hash: &str) -> DatabaseResult<RecordId> {
        self.run("login", |conn| {
            let user = SqliteUserRepository::new(conn)
                .select_by_username(username)?
                .into_iter()
                .next()
                .ok_or_else(|| DatabaseError::UnknownUsername(username.to_string()))?;

            if !user.password_matches(password_hash) {
                return Err(DatabaseError::PasswordMismatch);
            }
            debug!("event=login module=service status=ok user_id={}", user.id);
            Ok(user.id)
        })
    }

    /// Inserts a new user; a taken username yields `Conflict`.
    pub fn register_user(&self, profile: UserProfile) -> DatabaseResult<RecordId> {
        self.run("register_user", |conn| {
            let id = SqliteUserRepository::new(conn).insert(&User::new(profile))?;
            debug!("event=register_user module=service status=ok user_id={}", id);
            Ok(id)
        })
    }

    pub fn get_user_data(&self, user_id: RecordId) -> DatabaseResult<User> {
        self.run("get_user_data", |conn| {
            SqliteUserRepository::new(conn)
                .select_by_id(user_id)?
                .ok_or_else(|| not_found(RecordKind::User, user_id))
        })
    }

    /// Overwrites every user field, password hash included.
    pub fn change_user_data(&self, user_id: RecordId, profile: UserProfile) -> DatabaseResult<()> {
        self.run("change_user_data", |conn| {
            SqliteUserRepository::new(conn).update(&User::with_id(user_id, profile))?;
            debug!(
                "event=change_user_data module=service status=ok user_id={}",
                user_id
            );
            Ok(())
        })
    }

    /// Replaces the password hash after verifying the old one.
    pub fn change_password(
        &self,
        user_id: RecordId,
        old_password_hash: &str,
        new_password_hash: &str,
    ) -> DatabaseResult<()> {
        if old_password_hash == new_password_hash {
            error!(
                "event=change_password module=service status=error error_code=password_unchanged user_id={}",
                user_id
            );
            return Err(DatabaseError::PasswordUnchanged);
        }

        self.run_in_transaction("change_password", |conn| {
            let users = SqliteUserRepository::new(conn);
            let mut user = users
                .select_by_id(user_id)?
                .ok_or_else(|| not_found(RecordKind::User, user_id))?;

            if !user.password_matches(old_password_hash) {
                return Err(DatabaseError::PasswordMismatch);
            }

            user.password_hash = new_password_hash.to_string();
            users.update(&user)?;
            debug!(
                "event=change_password module=service status=ok user_id={}",
                user_id
            );
            Ok(())
        })
    }

    // ---- devices ----

    /// Registers a device under an existing user.
    pub fn add_device(
        &self,
        user_id: RecordId,
        serial_number: i64,
        current_location: &str,
        device_name: &str,
        firmware_version: i64,
    ) -> DatabaseResult<RecordId> {
        self.run_in_transaction("add_device", |conn| {
            ensure_exists(
                SqliteUserRepository::new(conn).select_by_id(user_id)?,
                RecordKind::User,
                user_id,
            )?;

            let device = Device::new(
                user_id,
                serial_number,
                current_location,
                device_name,
                firmware_version,
            );
            let id = SqliteDeviceRepository::new(conn).insert(&device)?;
            debug!(
                "event=add_device module=service status=ok device_id={} user_id={}",
                id, user_id
            );
            Ok(id)
        })
    }

    /// Devices owned by `user_id`; empty when there are none.
    pub fn get_registered_devices_list(&self, user_id: RecordId) -> DatabaseResult<Vec<Device>> {
        self.run("get_registered_devices_list", |conn| {
            let devices = SqliteDeviceRepository::new(conn).select_by_user(user_id)?;
            debug!(
                "event=get_registered_devices_list module=service status=ok user_id={} count={}",
                user_id,
                devices.len()
            );
            Ok(devices)
        })
    }

    pub fn change_device_name(&self, device_id: RecordId, new_name: &str) -> DatabaseResult<()> {
        self.run_in_transaction("change_device_name", |conn| {
            let devices = SqliteDeviceRepository::new(conn);
            let mut device = devices
                .select_by_id(device_id)?
                .ok_or_else(|| not_found(RecordKind::Device, device_id))?;

            device.device_name = new_name.to_string();
            devices.update(&device)?;
            debug!(
                "event=change_device_name module=service status=ok device_id={}",
                device_id
            );
            Ok(())
        })
    }

    pub fn update_device_location(
        &self,
        device_id: RecordId,
        new_location: &str,
    ) -> DatabaseResult<()> {
        self.run_in_transaction("update_device_location", |conn| {
            let devices = SqliteDeviceRepository::new(conn);
            let mut device = devices
                .select_by_id(device_id)?
                .ok_or_else(|| not_found(RecordKind::Device, device_id))?;
            if device.is_sentinel() {
                return Err(not_found(RecordKind::Device, device_id));
            }

            device.current_location = new_location.to_string();
            devices.update(&device)?;
            debug!(
                "event=update_device_location module=service status=ok device_id={}",
                device_id
            );
            Ok(())
        })
    }

    pub fn get_device_info(&self, device_id: RecordId) -> DatabaseResult<Device> {
        self.run("get_device_info", |conn| {
            SqliteDeviceRepository::new(conn)
                .select_by_id(device_id)?
                .ok_or_else(|| not_found(RecordKind::Device, device_id))
        })
    }

    /// Deletes the device row; its tracks are left untouched.
    pub fn delete_device(&self, device_id: RecordId) -> DatabaseResult<()> {
        self.run("delete_device", |conn| {
            SqliteDeviceRepository::new(conn).delete(device_id)?;
            debug!(
                "event=delete_device module=service status=ok device_id={}",
                device_id
            );
            Ok(())
        })
    }

    // ---- tracks ----

    /// Starts an open track for an existing device.
    pub fn add_track(
        &self,
        device_id: RecordId,
        start_timestamp: i64,
        start_location: &str,
    ) -> DatabaseResult<RecordId> {
        self.add_track_with(NewTrack::open(device_id, start_timestamp, start_location))
    }

    /// Inserts a track with optional end fields already set.
    pub fn add_track_with(&self, request: NewTrack) -> DatabaseResult<RecordId> {
        self.run_in_transaction("add_track", |conn| {
            let device_id = request.device_id;
            ensure_exists(
                SqliteDeviceRepository::new(conn).select_by_id(device_id)?,
                RecordKind::Device,
                device_id,
            )?;

            let id = SqliteTrackRepository::new(conn).insert(&Track::new(request))?;
            debug!(
                "event=add_track module=service status=ok track_id={} device_id={}",
                id, device_id
            );
            Ok(id)
        })
    }

    pub fn get_tracks_list(&self, device_id: RecordId) -> DatabaseResult<Vec<Track>> {
        self.run("get_tracks_list", |conn| {
            let tracks = SqliteTrackRepository::new(conn).select_by_device(device_id)?;
            debug!(
                "event=get_tracks_list module=service status=ok device_id={} count={}",
                device_id,
                tracks.len()
            );
            Ok(tracks)
        })
    }

    pub fn get_track_info(&self, track_id: RecordId) -> DatabaseResult<Track> {
        self.run("get_track_info", |conn| {
            SqliteTrackRepository::new(conn)
                .select_by_id(track_id)?
                .ok_or_else(|| not_found(RecordKind::Track, track_id))
        })
    }

    /// Samples of the track ordered by timestamp.
    pub fn get_track_details(&self, track_id: RecordId) -> DatabaseResult<Vec<Sample>> {
        self.run("get_track_details", |conn| {
            let samples = SqliteSampleRepository::new(conn).select_by_track(track_id)?;
            debug!(
                "event=get_track_details module=service status=ok track_id={} count={}",
                track_id,
                samples.len()
            );
            Ok(samples)
        })
    }

    /// Closes the track. Calling it again overwrites the end fields.
    pub fn end_track(&self, track_id: RecordId, end: TrackEnd) -> DatabaseResult<()> {
        self.run_in_transaction("end_track", |conn| {
            let tracks = SqliteTrackRepository::new(conn);
            let mut track = tracks
                .select_by_id(track_id)?
                .ok_or_else(|| not_found(RecordKind::Track, track_id))?;

            let was_closed = track.is_closed();
            track.close(end);
            tracks.update(&track)?;
            debug!(
                "event=end_track module=service status=ok track_id={} overwrote_end={}",
                track_id, was_closed
            );
            Ok(())
        })
    }

    /// Deletes the track row; its samples are left untouched.
    pub fn delete_track(&self, track_id: RecordId) -> DatabaseResult<()> {
        self.run("delete_track", |conn| {
            SqliteTrackRepository::new(conn).delete(track_id)?;
            debug!(
                "event=delete_track module=service status=ok track_id={}",
                track_id
            );
            Ok(())
        })
    }

    // ---- samples ----

    /// Appends one location sample to an existing track.
    pub fn add_track_sample(
        &self,
        track_id: RecordId,
        timestamp: i64,
        coordinates: &str,
        speed: i64,
        acceleration: i64,
        azimuth: i64,
    ) -> DatabaseResult<RecordId> {
        self.run_in_transaction("add_track_sample", |conn| {
            ensure_exists(
                SqliteTrackRepository::new(conn).select_by_id(track_id)?,
                RecordKind::Track,
                track_id,
            )?;

            let sample = Sample::new(
                track_id,
                timestamp,
                coordinates,
                speed,
                acceleration,
                azimuth,
            );
            let id = SqliteSampleRepository::new(conn).insert(&sample)?;
            debug!(
                "event=add_track_sample module=service status=ok sample_id={} track_id={}",
                id, track_id
            );
            Ok(id)
        })
    }

    fn lock(&self) -> DatabaseResult<MutexGuard<'_, Connection>> {
        self.conn
            .try_lock_for(self.lock_timeout)
            .ok_or(DatabaseError::LockTimeout {
                waited: self.lock_timeout,
            })
    }

    fn run<T>(
        &self,
        op: &'static str,
        body: impl FnOnce(&Connection) -> DatabaseResult<T>,
    ) -> DatabaseResult<T> {
        let result = self.lock().and_then(|guard| body(&*guard));
        log_failure(op, &result);
        result
    }

    fn run_in_transaction<T>(
        &self,
        op: &'static str,
        body: impl FnOnce(&Connection) -> DatabaseResult<T>,
    ) -> DatabaseResult<T> {
        let result = self.lock().and_then(|mut guard| {
            let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = body(&*tx)?;
            tx.commit()?;
            Ok(value)
        });
        log_failure(op, &result);
        result
    }
}

fn not_found(kind: RecordKind, id: RecordId) -> DatabaseError {
    DatabaseError::NotFound { kind, id }
}

fn ensure_exists<R: Record>(
    record: Option<R>,
    kind: RecordKind,
    id: RecordId,
) -> DatabaseResult<()> {
    match record {
        Some(_) => Ok(()),
        None => Err(not_found(kind, id)),
    }
}

fn log_failure<T>(op: &'static str, result: &DatabaseResult<T>) {
    if let Err(err) = result {
        error!(
            "event={} module=service status=error error_kind={:?} lock_timeout={} error={}",
            op,
            err.kind(),
            err.is_lock_timeout(),
            err
        );
    }
}
