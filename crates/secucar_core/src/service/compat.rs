//! Helpers for callers that only branch on success.
//!
//! Collapses typed results into the integer status codes and sentinel
//! records used by older transport clients.

use crate::model::record::Record;
use crate::service::error::DatabaseResult;

pub const STATUS_OK: i32 = 1;
pub const STATUS_FAILED: i32 = -1;

/// `STATUS_OK` for success, `STATUS_FAILED` for any error.
pub fn status_code<T>(result: &DatabaseResult<T>) -> i32 {
    if result.is_ok() {
        STATUS_OK
    } else {
        STATUS_FAILED
    }
}

/// Returns the record, or the sentinel record (identity `-1`) on failure.
pub fn or_sentinel<R: Record>(result: DatabaseResult<R>) -> R {
    result.unwrap_or_else(|_| R::sentinel())
}
