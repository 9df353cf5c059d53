//! Command descriptors for the Bluetti Modbus protocol.
//!
//! A command is immutable once built: its request bytes are serialized up
//! front and the expected response length is derived from the function
//! code and register quantity.

use std::fmt;

use bytes::Bytes;

use crate::protocol::frame;

/// Modbus function codes understood by Bluetti devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read a contiguous block of holding registers.
    ReadHoldingRegisters = 0x03,
    /// Write one holding register.
    WriteSingleRegister = 0x06,
}

impl From<FunctionCode> for u8 {
    fn from(code: FunctionCode) -> Self {
        code as Self
    }
}

/// A single request to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    function: FunctionCode,
    address: u16,
    /// Register quantity for reads, register value for writes.
    operand: u16,
    bytes: Bytes,
}

impl Command {
    /// Creates a command reading `quantity` registers starting at `address`.
    #[must_use]
    pub fn read_holding_registers(address: u16, quantity: u16) -> Self {
        Self::new(FunctionCode::ReadHoldingRegisters, address, quantity)
    }

    /// Creates a command writing `value` to the register at `address`.
    #[must_use]
    pub fn write_single_register(address: u16, value: u16) -> Self {
        Self::new(FunctionCode::WriteSingleRegister, address, value)
    }

    fn new(function: FunctionCode, address: u16, operand: u16) -> Self {
        Self {
            function,
            address,
            operand,
            bytes: frame::encode_request(function, address, operand),
        }
    }

    /// Returns the function code.
    #[must_use]
    pub const fn function(&self) -> FunctionCode {
        self.function
    }

    /// Returns the first register addressed by this command.
    #[must_use]
    pub const fn starting_address(&self) -> u16 {
        self.address
    }

    /// Returns the number of registers read, or `None` for writes.
    #[must_use]
    pub const fn quantity(&self) -> Option<u16> {
        match self.function {
            FunctionCode::ReadHoldingRegisters => Some(self.operand),
            FunctionCode::WriteSingleRegister => None,
        }
    }

    /// Returns the serialized request frame.
    #[must_use]
    pub const fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Returns the total length of a successful response frame.
    ///
    /// Reads answer with `[unit, function, byte_count, data..., crc_lo, crc_hi]`,
    /// single-register writes echo the 8-byte request.
    #[must_use]
    pub const fn expected_response_len(&self) -> usize {
        match self.function {
            FunctionCode::ReadHoldingRegisters => {
                frame::READ_HEADER_LEN + 2 * self.operand as usize + frame::CRC_LEN
            }
            FunctionCode::WriteSingleRegister => frame::REQUEST_LEN,
        }
    }

    /// Checks the trailing CRC of a complete response.
    #[must_use]
    pub fn is_valid_checksum(&self, buffer: &[u8]) -> bool {
        frame::validate(buffer, self).is_ok()
    }

    /// Checks whether the buffer is a Modbus exception reply to this command.
    #[must_use]
    pub fn is_exception_frame(&self, buffer: &[u8]) -> bool {
        frame::is_exception_frame(buffer, self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.function {
            FunctionCode::ReadHoldingRegisters => {
                write!(f, "ReadHoldingRegisters({}, {})", self.address, self.operand)
            }
            FunctionCode::WriteSingleRegister => {
                write!(f, "WriteSingleRegister({}, {})", self.address, self.operand)
            }
        }
    }
}
