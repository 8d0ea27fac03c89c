//! Location sample repository.

use super::record_store::RecordStore;
use super::RepoResult;
use crate::db::Criteria;
use crate::model::record::RecordId;
use crate::model::sample::Sample;
use rusqlite::Connection;

/// Repository interface for the `samples` table.
pub trait SampleRepository {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<Sample>>;
    /// Samples of `track_id` ordered by timestamp, ties by identity.
    fn select_by_track(&self, track_id: RecordId) -> RepoResult<Vec<Sample>>;
    fn insert(&self, sample: &Sample) -> RepoResult<RecordId>;
    fn update(&self, sample: &Sample) -> RepoResult<()>;
    fn delete(&self, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed sample repository.
pub struct SqliteSampleRepository<'conn> {
    store: RecordStore<'conn, Sample>,
}

impl<'conn> SqliteSampleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            store: RecordStore::new(conn),
        }
    }
}

impl SampleRepository for SqliteSampleRepository<'_> {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<Sample>> {
        self.store.select_by_id(id)
    }

    fn select_by_track(&self, track_id: RecordId) -> RepoResult<Vec<Sample>> {
        self.store.select_where(
            &Criteria::all().eq("track_id", track_id),
            &["timestamp", "id"],
        )
    }

    fn insert(&self, sample: &Sample) -> RepoResult<RecordId> {
        self.store.insert(sample)
    }

    fn update(&self, sample: &Sample) -> RepoResult<()> {
        self.store.update(sample)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.store.delete(id)
    }
}
