//! Decoded register values.

use std::fmt;

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Raw unsigned register value.
    Uint(u16),
    /// Register compared against 1.
    Bool(bool),
    /// Fixed-point register divided by a power of ten.
    Decimal(f64),
    /// ASCII text packed two characters per register.
    Text(String),
    /// 64-bit serial number spread over four registers, low word first.
    Serial(u64),
    /// Firmware version spread over two registers, divided by 100.
    Version(f64),
    /// Named enum variant.
    Enum(&'static str),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Decimal(v) | Self::Version(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Serial(v) => write!(f, "{v}"),
            Self::Enum(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Enum("STANDARD").to_string(), "STANDARD");
        assert_eq!(FieldValue::Decimal(12.5).to_string(), "12.5");
        assert_eq!(FieldValue::Serial(2_235_000_123_456).to_string(), "2235000123456");
    }
}
