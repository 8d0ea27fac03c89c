//! Track record and its open/closed lifecycle.
//!
//! # Invariants
//! - A track is open while `end_timestamp` is `None`.
//! - Closing happens only through `Track::close`; there is no reopen.
//! - Closing an already closed track overwrites the end fields.

use super::record::{row_fits, Record, RecordId, RecordKind, SENTINEL_ID, UNASSIGNED_ID};
use crate::db::driver::ColumnValues;
use crate::db::SqlRow;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// One recorded trip of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: RecordId,
    pub device_id: RecordId,
    /// Unix epoch seconds.
    pub start_timestamp: i64,
    pub start_location: String,
    /// Unix epoch seconds; `None` while the track is open.
    pub end_timestamp: Option<i64>,
    pub end_location: Option<String>,
    pub distance: Option<i64>,
    pub maneuver_assessment: Option<i64>,
}

/// End-of-trip fields written when a track is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEnd {
    pub end_timestamp: i64,
    pub end_location: String,
    pub distance: i64,
    pub maneuver_assessment: i64,
}

/// Insert request for a track.
///
/// End fields default to unset, which yields an open track.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTrack {
    pub device_id: RecordId,
    pub start_timestamp: i64,
    pub start_location: String,
    pub end_timestamp: Option<i64>,
    pub end_location: Option<String>,
    pub distance: Option<i64>,
    pub maneuver_assessment: Option<i64>,
}

impl NewTrack {
    pub fn open(device_id: RecordId, start_timestamp: i64, start_location: impl Into<String>) -> Self {
        Self {
            device_id,
            start_timestamp,
            start_location: start_location.into(),
            ..Self::default()
        }
    }
}

impl Track {
    pub fn new(request: NewTrack) -> Self {
        Self {
            id: UNASSIGNED_ID,
            device_id: request.device_id,
            start_timestamp: request.start_timestamp,
            start_location: request.start_location,
            end_timestamp: request.end_timestamp,
            end_location: request.end_location,
            distance: request.distance,
            maneuver_assessment: request.maneuver_assessment,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_timestamp.is_none()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Sets the end fields, closing the track. Last write wins.
    pub fn close(&mut self, end: TrackEnd) {
        self.end_timestamp = Some(end.end_timestamp);
        self.end_location = Some(end.end_location);
        self.distance = Some(end.distance);
        self.maneuver_assessment = Some(end.maneuver_assessment);
    }
}

impl Record for Track {
    const KIND: RecordKind = RecordKind::Track;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn to_columns(&self) -> ColumnValues {
        vec![
            ("device_id", Value::Integer(self.device_id)),
            ("start_timestamp", Value::Integer(self.start_timestamp)),
            ("start_location", Value::Text(self.start_location.clone())),
            ("end_timestamp", Value::from(self.end_timestamp)),
            ("end_location", Value::from(self.end_location.clone())),
            ("distance", Value::from(self.distance)),
            ("maneuver_assessment", Value::from(self.maneuver_assessment)),
        ]
    }

    fn from_row(row: &SqlRow) -> Option<Self> {
        if !row_fits(Self::KIND, row) {
            return None;
        }
        Some(Self {
            id: row.integer(0)?,
            device_id: row.integer(1)?,
            start_timestamp: row.integer(2)?,
            start_location: row.text(3)?,
            end_timestamp: row.optional_integer(4)?,
            end_location: row.optional_text(5)?,
            distance: row.optional_integer(6)?,
            maneuver_assessment: row.optional_integer(7)?,
        })
    }

    fn sentinel() -> Self {
        Self {
            id: SENTINEL_ID,
            device_id: SENTINEL_ID,
            start_timestamp: -1,
            start_location: String::new(),
            end_timestamp: None,
            end_location: None,
            distance: None,
            maneuver_assessment: None,
        }
    }

    fn describe(&self) -> String {
        format!(
            "id={} device_id={} start_timestamp={} start_location={} end_timestamp={:?} end_location={:?} distance={:?} maneuver_assessment={:?}",
            self.id,
            self.device_id,
            self.start_timestamp,
            self.start_location,
            self.end_timestamp,
            self.end_location,
            self.distance,
            self.maneuver_assessment
        )
    }
}
