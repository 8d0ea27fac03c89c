//! Track repository.

use super::record_store::RecordStore;
use super::RepoResult;
use crate::db::Criteria;
use crate::model::record::RecordId;
use crate::model::track::Track;
use rusqlite::Connection;

/// Repository interface for the `tracks` table.
pub trait TrackRepository {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<Track>>;
    /// Tracks recorded by `device_id`, ordered by identity.
    fn select_by_device(&self, device_id: RecordId) -> RepoResult<Vec<Track>>;
    fn insert(&self, track: &Track) -> RepoResult<RecordId>;
    fn update(&self, track: &Track) -> RepoResult<()>;
    /// Deletes the track row only; its samples stay in place.
    fn delete(&self, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed track repository.
pub struct SqliteTrackRepository<'conn> {
    store: RecordStore<'conn, Track>,
}

impl<'conn> SqliteTrackRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            store: RecordStore::new(conn),
        }
    }
}

impl TrackRepository for SqliteTrackRepository<'_> {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<Track>> {
        self.store.select_by_id(id)
    }

    fn select_by_device(&self, device_id: RecordId) -> RepoResult<Vec<Track>> {
        self.store
            .select_where(&Criteria::all().eq("device_id", device_id), &["id"])
    }

    fn insert(&self, track: &Track) -> RepoResult<RecordId> {
        self.store.insert(track)
    }

    fn update(&self, track: &Track) -> RepoResult<()> {
        self.store.update(track)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.store.delete(id)
    }
}
