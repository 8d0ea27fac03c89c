//! Shared record contract.

use crate::db::driver::ColumnValues;
use crate::db::{SqlRow, Table};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage-generated identity shared by every record.
pub type RecordId = i64;

/// Identity carried by records before storage assigns one.
pub const UNASSIGNED_ID: RecordId = 0;

/// Identity carried by sentinel "not found" records.
pub const SENTINEL_ID: RecordId = -1;

/// Entity tag for the four record variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    User,
    Device,
    Track,
    Sample,
}

impl RecordKind {
    pub fn table(self) -> Table {
        match self {
            Self::User => Table::Users,
            Self::Device => Table::Devices,
            Self::Track => Table::Tracks,
            Self::Sample => Table::Samples,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Device => "device",
            Self::Track => "track",
            Self::Sample => "sample",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract between typed records and the table-agnostic driver.
pub trait Record: Sized {
    const KIND: RecordKind;

    fn id(&self) -> RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Data columns in `Table::columns()` order, identity excluded.
    fn to_columns(&self) -> ColumnValues;

    /// Parses a positional row (identity first).
    ///
    /// Returns `None` when the row width or any cell type does not match.
    fn from_row(row: &SqlRow) -> Option<Self>;

    /// Record with identity `-1`, empty strings and `-1` numbers.
    fn sentinel() -> Self;

    /// Single-line `key=value` rendering for diagnostics.
    ///
    /// Must never include credentials.
    fn describe(&self) -> String;

    fn is_sentinel(&self) -> bool {
        self.id() == SENTINEL_ID
    }

    /// Writes the record to the debug log.
    fn log_record(&self) {
        debug!(
            "event=record_dump module=model kind={} {}",
            Self::KIND,
            self.describe()
        );
    }
}

/// Checks that a row carries exactly the columns of `kind`'s table.
pub(crate) fn row_fits(kind: RecordKind, row: &SqlRow) -> bool {
    row.len() == kind.table().row_columns().len()
}
