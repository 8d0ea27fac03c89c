//! Device repository.

use super::record_store::RecordStore;
use super::RepoResult;
use crate::db::Criteria;
use crate::model::device::Device;
use crate::model::record::RecordId;
use rusqlite::Connection;

/// Repository interface for the `devices` table.
pub trait DeviceRepository {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<Device>>;
    /// Devices owned by `user_id`, ordered by identity.
    fn select_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Device>>;
    fn insert(&self, device: &Device) -> RepoResult<RecordId>;
    fn update(&self, device: &Device) -> RepoResult<()>;
    /// Deletes the device row only; its tracks stay in place.
    fn delete(&self, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed device repository.
pub struct SqliteDeviceRepository<'conn> {
    store: RecordStore<'conn, Device>,
}

impl<'conn> SqliteDeviceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            store: RecordStore::new(conn),
        }
    }
}

impl DeviceRepository for SqliteDeviceRepository<'_> {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<Device>> {
        self.store.select_by_id(id)
    }

    fn select_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Device>> {
        self.store
            .select_where(&Criteria::all().eq("user_id", user_id), &["id"])
    }

    fn insert(&self, device: &Device) -> RepoResult<RecordId> {
        self.store.insert(device)
    }

    fn update(&self, device: &Device) -> RepoResult<()> {
        self.store.update(device)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.store.delete(id)
    }
}
