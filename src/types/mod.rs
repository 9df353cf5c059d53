//! Data types for decoded device state.
//!
//! This module contains the structures produced by a poll cycle:
//! - Field values decoded from registers
//! - Snapshots aggregating the fields of one cycle

pub mod snapshot;
pub mod value;

pub use snapshot::Snapshot;
pub use value::FieldValue;
