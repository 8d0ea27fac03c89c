//! User record.

use super::record::{row_fits, Record, RecordId, RecordKind, SENTINEL_ID, UNASSIGNED_ID};
use crate::db::driver::ColumnValues;
use crate::db::SqlRow;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Caller-supplied user fields, everything except identity.
///
/// Used for registration and for full profile overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub telephone_number: i64,
    pub city: String,
    pub street: String,
    pub home_number: i64,
    pub flat_number: i64,
    pub postal_code: String,
    /// Pre-hashed credential; compared byte-for-byte, never in clear text.
    pub password_hash: String,
}

/// Registered account owning zero or more devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub telephone_number: i64,
    pub city: String,
    pub street: String,
    pub home_number: i64,
    pub flat_number: i64,
    pub postal_code: String,
    /// Never serialized towards callers.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

impl User {
    /// Builds a not-yet-inserted user from profile fields.
    pub fn new(profile: UserProfile) -> Self {
        Self::with_id(UNASSIGNED_ID, profile)
    }

    pub fn with_id(id: RecordId, profile: UserProfile) -> Self {
        Self {
            id,
            username: profile.username,
            name: profile.name,
            surname: profile.surname,
            email: profile.email,
            telephone_number: profile.telephone_number,
            city: profile.city,
            street: profile.street,
            home_number: profile.home_number,
            flat_number: profile.flat_number,
            postal_code: profile.postal_code,
            password_hash: profile.password_hash,
        }
    }

    /// Byte-for-byte comparison against the stored hash.
    pub fn password_matches(&self, password_hash: &str) -> bool {
        self.password_hash.as_bytes() == password_hash.as_bytes()
    }
}

impl Record for User {
    const KIND: RecordKind = RecordKind::User;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn to_columns(&self) -> ColumnValues {
        vec![
            ("username", Value::Text(self.username.clone())),
            ("name", Value::Text(self.name.clone())),
            ("surname", Value::Text(self.surname.clone())),
            ("email", Value::Text(self.email.clone())),
            ("telephone_number", Value::Integer(self.telephone_number)),
            ("city", Value::Text(self.city.clone())),
            ("street", Value::Text(self.street.clone())),
            ("home_number", Value::Integer(self.home_number)),
            ("flat_number", Value::Integer(self.flat_number)),
            ("postal_code", Value::Text(self.postal_code.clone())),
            ("password_hash", Value::Text(self.password_hash.clone())),
        ]
    }

    fn from_row(row: &SqlRow) -> Option<Self> {
        if !row_fits(Self::KIND, row) {
            return None;
        }
        Some(Self {
            id: row.integer(0)?,
            username: row.text(1)?,
            name: row.text(2)?,
            surname: row.text(3)?,
            email: row.text(4)?,
            telephone_number: row.integer(5)?,
            city: row.text(6)?,
            street: row.text(7)?,
            home_number: row.integer(8)?,
            flat_number: row.integer(9)?,
            postal_code: row.text(10)?,
            password_hash: row.text(11)?,
        })
    }

    fn sentinel() -> Self {
        Self {
            id: SENTINEL_ID,
            username: String::new(),
            name: String::new(),
            surname: String::new(),
            email: String::new(),
            telephone_number: -1,
            city: String::new(),
            street: String::new(),
            home_number: -1,
            flat_number: -1,
            postal_code: String::new(),
            password_hash: String::new(),
        }
    }

    fn describe(&self) -> String {
        format!(
            "id={} username={} city={} postal_code={}",
            self.id, self.username, self.city, self.postal_code
        )
    }
}
