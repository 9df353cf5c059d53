//! Frame encoding and validation for the Bluetti Modbus protocol.
//!
//! Requests and responses are Modbus RTU frames carried verbatim over the
//! GATT characteristics:
//! ```text
//! request:   ┌──────┬──────┬─────────────┬─────────────┬──────────┐
//!            │ 0x01 │ func │ address(BE) │ operand(BE) │ crc (LE) │
//!            └──────┴──────┴─────────────┴─────────────┴──────────┘
//! read resp: ┌──────┬──────┬───────┬──────────────────┬──────────┐
//!            │ 0x01 │ 0x03 │ count │   count bytes    │ crc (LE) │
//!            └──────┴──────┴───────┴──────────────────┴──────────┘
//! exception: ┌──────┬─────────────┬──────┬──────────┐
//!            │ 0x01 │ func | 0x80 │ code │ crc (LE) │
//!            └──────┴─────────────┴──────┴──────────┘
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use crc16::{MODBUS, State};

use crate::error::FrameError;
use crate::protocol::command::{Command, FunctionCode};

/// Modbus unit id used by all Bluetti devices.
pub const UNIT_ID: u8 = 0x01;

/// Bit set on the function code of an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Length of the trailing CRC.
pub const CRC_LEN: usize = 2;

/// Length of a request frame.
pub const REQUEST_LEN: usize = 8;

/// Header length of a read response (unit, function, byte count).
pub const READ_HEADER_LEN: usize = 3;

/// Length of an exception frame.
pub const EXCEPTION_FRAME_LEN: usize = 5;

/// Sequences some BLE bridges emit when the link is in a bad state.
pub const BAD_CONNECTION_SEQUENCES: [&[u8]; 2] = [b"AT+NAME?\r", b"AT+ADV?\r"];

/// Computes the Modbus CRC-16 of `data`.
#[must_use]
pub fn crc(data: &[u8]) -> u16 {
    State::<MODBUS>::calculate(data)
}

/// Serializes a request frame.
#[must_use]
pub fn encode_request(function: FunctionCode, address: u16, operand: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(REQUEST_LEN);
    buf.put_u8(UNIT_ID);
    buf.put_u8(function.into());
    buf.put_u16(address);
    buf.put_u16(operand);
    let crc = crc(&buf);
    buf.put_u16_le(crc);
    buf.freeze()
}

/// Returns the request bytes for `command`.
#[must_use]
pub fn encode(command: &Command) -> Bytes {
    command.as_bytes().clone()
}

/// Returns true if `chunk` is one of the out-of-band link noise sequences.
#[must_use]
pub fn is_bad_connection(chunk: &[u8]) -> bool {
    BAD_CONNECTION_SEQUENCES.iter().any(|seq| *seq == chunk)
}

/// Checks whether `buffer` has the shape of an exception reply to `command`.
#[must_use]
pub fn is_exception_frame(buffer: &[u8], command: &Command) -> bool {
    buffer.len() >= EXCEPTION_FRAME_LEN
        && buffer[1] == u8::from(command.function()) | EXCEPTION_FLAG
}

/// Returns the exception code carried by an exception frame.
#[must_use]
pub fn exception_code(buffer: &[u8]) -> u8 {
    buffer.get(2).copied().unwrap_or_default()
}

/// Validates the trailing CRC of a complete response frame.
///
/// # Errors
///
/// Returns a `FrameError` if:
/// - The buffer is not exactly the command's expected response length
/// - The CRC does not match
pub fn validate(buffer: &[u8], command: &Command) -> Result<Bytes, FrameError> {
    let expected_len = command.expected_response_len();
    if buffer.len() != expected_len {
        return Err(FrameError::LengthMismatch {
            expected: expected_len,
            got: buffer.len(),
        });
    }

    let (body, tail) = buffer.split_at(buffer.len() - CRC_LEN);
    let expected = crc(body);
    let actual = u16::from_le_bytes([tail[0], tail[1]]);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    Ok(Bytes::copy_from_slice(buffer))
}

/// Returns the register data of a validated read response.
///
/// Write echoes carry no register data and yield an empty slice.
#[must_use]
pub fn payload<'a>(command: &Command, frame: &'a [u8]) -> &'a [u8] {
    match command.function() {
        FunctionCode::ReadHoldingRegisters if frame.len() >= READ_HEADER_LEN + CRC_LEN => {
            &frame[READ_HEADER_LEN..frame.len() - CRC_LEN]
        }
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_reference_vector() {
        let data = hex::decode("010318240c000002a7000000000000000000000000000000000000").unwrap();
        assert_eq!(crc(&data), 0x90bc);
    }

    #[test]
    fn test_encode_request() {
        let frame = encode_request(FunctionCode::ReadHoldingRegisters, 70, 21);
        assert_eq!(frame.as_ref(), hex::decode("01030046001565d0").unwrap());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let cmd = Command::read_holding_registers(3000, 62);
        assert_eq!(encode(&cmd), encode(&cmd));
        assert_eq!(encode(&cmd).as_ref(), hex::decode("01030bb8003e461b").unwrap());
    }

    #[test]
    fn test_bad_connection_sequences() {
        assert!(is_bad_connection(b"AT+NAME?\r"));
        assert!(is_bad_connection(b"AT+ADV?\r"));
        assert!(!is_bad_connection(b"AT+NAME?"));
        assert!(!is_bad_connection(&[0x01, 0x03]));
    }

    #[test]
    fn test_exception_frame_needs_full_shape() {
        let cmd = Command::read_holding_registers(10, 40);
        let frame = hex::decode("018302c0f1").unwrap();
        assert!(!is_exception_frame(&frame[..3], &cmd));
        assert!(is_exception_frame(&frame, &cmd));
        assert_eq!(exception_code(&frame), 0x02);

        let write = Command::write_single_register(3007, 1);
        assert!(!is_exception_frame(&frame, &write));
    }

    #[test]
    fn test_validate_ok() {
        let cmd = Command::read_holding_registers(43, 2);
        let frame = hex::decode("010304005000013be2").unwrap();
        let validated = validate(&frame, &cmd).unwrap();
        assert_eq!(payload(&cmd, &validated), &[0x00, 0x50, 0x00, 0x01]);
    }

    #[test]
    fn test_validate_checksum_mismatch() {
        let cmd = Command::read_holding_registers(43, 2);
        let mut frame = hex::decode("010304005000013be2").unwrap();
        frame[8] = 0x00;
        assert!(matches!(
            validate(&frame, &cmd),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_partial_frame() {
        let cmd = Command::read_holding_registers(43, 2);
        let frame = hex::decode("010304005000013b").unwrap();
        assert_eq!(
            validate(&frame, &cmd),
            Err(FrameError::LengthMismatch {
                expected: 9,
                got: 8
            })
        );
    }

    #[test]
    fn test_write_echo_has_no_payload() {
        let cmd = Command::write_single_register(3007, 1);
        let echo = cmd.as_bytes().clone();
        let validated = validate(&echo, &cmd).unwrap();
        assert!(payload(&cmd, &validated).is_empty());
    }
}
