//! Business operations over the record repositories.
//!
//! # Responsibility
//! - Compose repository calls into login, registration and device/track
//!   lifecycle operations.
//! - Enforce invariants that span entities (ownership, password rules).
//! - Collapse failures into a small `ErrorKind` partition for callers.
//!
//! # See also
//! - `compat` for callers that only branch on success.

pub mod compat;
pub mod database;
pub mod error;
