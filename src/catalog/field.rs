//! Register field definitions.
//!
//! Every field occupies one or more consecutive 16-bit big-endian holding
//! registers. Multi-register numbers are stored low word first.

use crate::types::FieldValue;

/// Variants of an enum field as `(raw value, name)` pairs.
pub type EnumVariants = &'static [(u16, &'static str)];

/// How the registers of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single raw register.
    Uint,
    /// Single register, true when equal to 1.
    Bool,
    /// Single register divided by `10^scale`.
    Decimal { scale: u8 },
    /// ASCII string of `registers * 2` bytes, NUL padded.
    Text { registers: u16 },
    /// Four-register serial number.
    SerialNumber,
    /// Two-register firmware version.
    Version,
    /// Single register mapped to a named variant.
    Enum(EnumVariants),
}

impl FieldKind {
    /// Returns the number of registers occupied.
    #[must_use]
    pub const fn registers(&self) -> u16 {
        match self {
            Self::Uint | Self::Bool | Self::Decimal { .. } | Self::Enum(_) => 1,
            Self::Text { registers } => *registers,
            Self::SerialNumber => 4,
            Self::Version => 2,
        }
    }
}

/// A named field at a register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Key used in snapshots.
    pub name: &'static str,
    /// First register.
    pub address: u16,
    /// Register interpretation.
    pub kind: FieldKind,
    /// Whether the field accepts `WriteSingleRegister`.
    pub writable: bool,
}

impl Field {
    const fn new(name: &'static str, address: u16, kind: FieldKind) -> Self {
        Self {
            name,
            address,
            kind,
            writable: false,
        }
    }

    pub(crate) const fn uint(name: &'static str, address: u16) -> Self {
        Self::new(name, address, FieldKind::Uint)
    }

    pub(crate) const fn bool(name: &'static str, address: u16) -> Self {
        Self::new(name, address, FieldKind::Bool)
    }

    pub(crate) const fn decimal(name: &'static str, address: u16, scale: u8) -> Self {
        Self::new(name, address, FieldKind::Decimal { scale })
    }

    pub(crate) const fn text(name: &'static str, address: u16, registers: u16) -> Self {
        Self::new(name, address, FieldKind::Text { registers })
    }

    pub(crate) const fn serial_number(name: &'static str, address: u16) -> Self {
        Self::new(name, address, FieldKind::SerialNumber)
    }

    pub(crate) const fn version(name: &'static str, address: u16) -> Self {
        Self::new(name, address, FieldKind::Version)
    }

    pub(crate) const fn enumeration(
        name: &'static str,
        address: u16,
        variants: EnumVariants,
    ) -> Self {
        Self::new(name, address, FieldKind::Enum(variants))
    }

    /// Marks the field as writable.
    pub(crate) const fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Returns the register after the last one occupied.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.address as u32 + self.kind.registers() as u32
    }

    /// Decodes the field from exactly `registers() * 2` bytes.
    ///
    /// Unknown enum values fall back to [`FieldValue::Uint`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn decode(&self, data: &[u8]) -> FieldValue {
        let words: Vec<u16> = data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        let first = words.first().copied().unwrap_or_default();

        match self.kind {
            FieldKind::Uint => FieldValue::Uint(first),
            FieldKind::Bool => FieldValue::Bool(first == 1),
            FieldKind::Decimal { scale } => {
                FieldValue::Decimal(f64::from(first) / 10f64.powi(i32::from(scale)))
            }
            FieldKind::Text { .. } => {
                let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                FieldValue::Text(String::from_utf8_lossy(&data[..end]).into_owned())
            }
            FieldKind::SerialNumber => FieldValue::Serial(combine_words(&words)),
            FieldKind::Version => FieldValue::Version(combine_words(&words) as f64 / 100.0),
            FieldKind::Enum(variants) => variants
                .iter()
                .find(|(raw, _)| *raw == first)
                .map_or(FieldValue::Uint(first), |&(_, name)| FieldValue::Enum(name)),
        }
    }
}

/// Combines registers stored low word first.
fn combine_words(words: &[u16]) -> u64 {
    words
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &w)| acc | (u64::from(w) << (16 * i)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: EnumVariants = &[(1, "LOW"), (2, "HIGH")];

    #[test]
    fn test_register_counts() {
        assert_eq!(FieldKind::Uint.registers(), 1);
        assert_eq!(FieldKind::Text { registers: 6 }.registers(), 6);
        assert_eq!(FieldKind::SerialNumber.registers(), 4);
        assert_eq!(FieldKind::Version.registers(), 2);
        assert_eq!(Field::text("device_type", 10, 6).end(), 16);
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(Field::uint("p", 0).decode(&[0x01, 0x5e]), FieldValue::Uint(350));
        assert_eq!(Field::bool("b", 0).decode(&[0x00, 0x01]), FieldValue::Bool(true));
        assert_eq!(Field::bool("b", 0).decode(&[0x00, 0x02]), FieldValue::Bool(false));
        assert_eq!(
            Field::decimal("d", 0, 1).decode(&[0x00, 0x7b]),
            FieldValue::Decimal(12.3)
        );
    }

    #[test]
    fn test_decode_text_strips_padding() {
        let field = Field::text("device_type", 10, 6);
        let mut data = b"AC300".to_vec();
        data.resize(12, 0);
        assert_eq!(field.decode(&data), FieldValue::Text("AC300".into()));
    }

    #[test]
    fn test_decode_serial_low_word_first() {
        let field = Field::serial_number("serial_number", 17);
        let data = [0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(field.decode(&data), FieldValue::Serial(0x0002_0001));
    }

    #[test]
    fn test_decode_version() {
        let field = Field::version("arm_version", 23);
        // 0x0001_0000 + 0x0E74 = 69236 -> 692.36
        let data = [0x0e, 0x74, 0x00, 0x01];
        assert_eq!(field.decode(&data), FieldValue::Version(692.36));
    }

    #[test]
    fn test_decode_enum() {
        let field = Field::enumeration("led_mode", 3034, MODES);
        assert_eq!(field.decode(&[0x00, 0x02]), FieldValue::Enum("HIGH"));
        assert_eq!(field.decode(&[0x00, 0x09]), FieldValue::Uint(9));
    }
}
