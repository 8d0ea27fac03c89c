//! Location sample record.

use super::record::{row_fits, Record, RecordId, RecordKind, SENTINEL_ID, UNASSIGNED_ID};
use crate::db::driver::ColumnValues;
use crate::db::SqlRow;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// One positional reading inside a track.
///
/// Samples of a track are read back ordered by `timestamp`; equal timestamps
/// are allowed and keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub id: RecordId,
    pub track_id: RecordId,
    /// Unix epoch seconds.
    pub timestamp: i64,
    pub coordinates: String,
    pub speed: i64,
    pub acceleration: i64,
    pub azimuth: i64,
}

impl Sample {
    pub fn new(
        track_id: RecordId,
        timestamp: i64,
        coordinates: impl Into<String>,
        speed: i64,
        acceleration: i64,
        azimuth: i64,
    ) -> Self {
        Self {
            id: UNASSIGNED_ID,
            track_id,
            timestamp,
            coordinates: coordinates.into(),
            speed,
            acceleration,
            azimuth,
        }
    }
}

impl Record for Sample {
    const KIND: RecordKind = RecordKind::Sample;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn to_columns(&self) -> ColumnValues {
        vec![
            ("track_id", Value::Integer(self.track_id)),
            ("timestamp", Value::Integer(self.timestamp)),
            ("coordinates", Value::Text(self.coordinates.clone())),
            ("speed", Value::Integer(self.speed)),
            ("acceleration", Value::Integer(self.acceleration)),
            ("azimuth", Value::Integer(self.azimuth)),
        ]
    }

    fn from_row(row: &SqlRow) -> Option<Self> {
        if !row_fits(Self::KIND, row) {
            return None;
        }
        Some(Self {
            id: row.integer(0)?,
            track_id: row.integer(1)?,
            timestamp: row.integer(2)?,
            coordinates: row.text(3)?,
            speed: row.integer(4)?,
            acceleration: row.integer(5)?,
            azimuth: row.integer(6)?,
        })
    }

    fn sentinel() -> Self {
        Self {
            id: SENTINEL_ID,
            track_id: SENTINEL_ID,
            timestamp: -1,
            coordinates: String::new(),
            speed: -1,
            acceleration: -1,
            azimuth: -1,
        }
    }

    fn describe(&self) -> String {
        format!(
            "id={} track_id={} timestamp={} coordinates={} speed={} acceleration={} azimuth={}",
            self.id,
            self.track_id,
            self.timestamp,
            self.coordinates,
            self.speed,
            self.acceleration,
            self.azimuth
        )
    }
}
