//! Typed records persisted by the repository layer.
//!
//! # Responsibility
//! - Define one plain struct per stored entity (user, device, track, sample).
//! - Provide the shared `Record` contract used by the generic record store.
//!
//! # Invariants
//! - Identity `0` marks a record that has not been inserted yet.
//! - Identity `-1` marks a sentinel "not found" record.
//! - Row layout is identity first, then `Table::columns()` in order.

pub mod device;
pub mod record;
pub mod sample;
pub mod track;
pub mod user;
