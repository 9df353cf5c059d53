//! Protocol definitions for Bluetti communication.
//!
//! This module contains the low-level protocol types including:
//! - Command descriptors and function codes
//! - Frame encoding, exception detection and checksum validation

pub mod command;
pub mod frame;

pub use command::{Command, FunctionCode};
pub use frame::{
    BAD_CONNECTION_SEQUENCES, CRC_LEN, EXCEPTION_FLAG, UNIT_ID, crc, encode as encode_frame,
    is_bad_connection, is_exception_frame, validate as validate_frame,
};
