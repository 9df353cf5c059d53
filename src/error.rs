//! Error types for the bluetti-ble library.

use thiserror::Error;

/// The main error type for bluetti-ble operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Bluetooth stack error.
    #[cfg(feature = "ble")]
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] bluest::Error),

    /// Generic link-level failure reported by a transport.
    #[error("link error: {message}")]
    Link { message: String },

    /// The advertised device name does not match any known model.
    #[error("unknown device type: {name}")]
    UnknownDevice { name: String },

    /// The device could not be found by discovery.
    #[error("device not available: {address}")]
    DeviceUnavailable { address: String },

    /// Connecting or subscribing to notifications failed.
    #[error("connection failed: {0}")]
    Connection(#[source] Box<Error>),

    /// The link failed while a session was in use.
    #[error("transport fault: {0}")]
    TransportFault(#[source] Box<Error>),

    /// The device echoed out-of-band AT commands instead of a response.
    #[error("bad connection: received out-of-band control sequence")]
    BadConnectionLink,

    /// No complete response arrived in time.
    #[error("response timed out after {timeout_ms}ms")]
    ResponseTimeout { timeout_ms: u64 },

    /// Response frame was malformed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The device answered with a Modbus exception frame.
    #[error("device rejected {command}: exception code {code:#04x}")]
    DeviceRejected { command: String, code: u8 },

    /// Response payload could not be decoded into fields.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Session is not connected.
    #[error("not connected")]
    NotConnected,

    /// No field with this name exists in the device model.
    #[error("unknown field: {name}")]
    UnknownField { name: String },

    /// The field exists but cannot be written.
    #[error("field is read-only: {name}")]
    ReadOnlyField { name: String },
}

impl Error {
    /// Returns true if the session can keep issuing commands after this error.
    ///
    /// Connection-level failures return false and end the command loop of a
    /// poll cycle.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ResponseTimeout { .. }
                | Self::Frame(_)
                | Self::DeviceRejected { .. }
                | Self::Decode(_)
                | Self::UnknownField { .. }
                | Self::ReadOnlyField { .. }
        )
    }

    pub(crate) fn timeout(timeout: std::time::Duration) -> Self {
        Self::ResponseTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Frame-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Trailing CRC does not match the frame contents.
    #[error("checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// More bytes arrived than the command's response can hold.
    #[error("frame overrun: expected {expected} bytes, got {got}")]
    Overrun { expected: usize, got: usize },

    /// Frame length does not match the command's response length.
    #[error("frame length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// A write acknowledgement does not echo the request.
    #[error("write echo does not match the request")]
    EchoMismatch,
}

/// Field decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Register data does not hold a whole number of registers.
    #[error("register data has odd length {0}")]
    OddLength(usize),

    /// Register data length does not match the command quantity.
    #[error("register data length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Result type alias for bluetti-ble operations.
pub type Result<T> = std::result::Result<T, Error>;
