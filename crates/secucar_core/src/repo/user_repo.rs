//! User repository.

use super::record_store::RecordStore;
use super::RepoResult;
use crate::db::Criteria;
use crate::model::record::RecordId;
use crate::model::user::User;
use rusqlite::Connection;

/// Repository interface for the `users` table.
pub trait UserRepository {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<User>>;
    /// Usernames are unique, so this yields at most one user.
    fn select_by_username(&self, username: &str) -> RepoResult<Vec<User>>;
    fn insert(&self, user: &User) -> RepoResult<RecordId>;
    fn update(&self, user: &User) -> RepoResult<()>;
    fn delete(&self, id: RecordId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    store: RecordStore<'conn, User>,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            store: RecordStore::new(conn),
        }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn select_by_id(&self, id: RecordId) -> RepoResult<Option<User>> {
        self.store.select_by_id(id)
    }

    fn select_by_username(&self, username: &str) -> RepoResult<Vec<User>> {
        self.store.select_where(
            &Criteria::all().eq("username", username.to_string()),
            &["id"],
        )
    }

    fn insert(&self, user: &User) -> RepoResult<RecordId> {
        self.store.insert(user)
    }

    fn update(&self, user: &User) -> RepoResult<()> {
        self.store.update(user)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.store.delete(id)
    }
}
