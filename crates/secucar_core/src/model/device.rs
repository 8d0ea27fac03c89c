//! Device record.

use super::record::{row_fits, Record, RecordId, RecordKind, SENTINEL_ID, UNASSIGNED_ID};
use crate::db::driver::ColumnValues;
use crate::db::SqlRow;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Tracking unit installed in a vehicle, owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: RecordId,
    /// Owning user identity.
    pub user_id: RecordId,
    pub serial_number: i64,
    /// Free-form last known location.
    pub current_location: String,
    pub device_name: String,
    pub firmware_version: i64,
}

impl Device {
    pub fn new(
        user_id: RecordId,
        serial_number: i64,
        current_location: impl Into<String>,
        device_name: impl Into<String>,
        firmware_version: i64,
    ) -> Self {
        Self {
            id: UNASSIGNED_ID,
            user_id,
            serial_number,
            current_location: current_location.into(),
            device_name: device_name.into(),
            firmware_version,
        }
    }
}

impl Record for Device {
    const KIND: RecordKind = RecordKind::Device;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn to_columns(&self) -> ColumnValues {
        vec![
            ("user_id", Value::Integer(self.user_id)),
            ("serial_number", Value::Integer(self.serial_number)),
            ("current_location", Value::Text(self.current_location.clone())),
            ("device_name", Value::Text(self.device_name.clone())),
            ("firmware_version", Value::Integer(self.firmware_version)),
        ]
    }

    fn from_row(row: &SqlRow) -> Option<Self> {
        if !row_fits(Self::KIND, row) {
            return None;
        }
        Some(Self {
            id: row.integer(0)?,
            user_id: row.integer(1)?,
            serial_number: row.integer(2)?,
            current_location: row.text(3)?,
            device_name: row.text(4)?,
            firmware_version: row.integer(5)?,
        })
    }

    fn sentinel() -> Self {
        Self {
            id: SENTINEL_ID,
            user_id: SENTINEL_ID,
            serial_number: -1,
            current_location: String::new(),
            device_name: String::new(),
            firmware_version: -1,
        }
    }

    fn describe(&self) -> String {
        format!(
            "id={} user_id={} serial_number={} device_name={} firmware_version={} current_location={}",
            self.id,
            self.user_id,
            self.serial_number,
            self.device_name,
            self.firmware_version,
            self.current_location
        )
    }
}
