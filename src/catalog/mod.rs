//! Device command catalog.
//!
//! Maps an advertised BLE name to a register layout, supplies the ordered
//! polling commands for that layout, and decodes validated responses into
//! snapshot fields.

pub mod field;
pub mod models;

pub use field::{EnumVariants, Field, FieldKind};
pub use models::{MODELS, ModelDefinition};

use crate::error::{DecodeError, Error, Result};
use crate::protocol::{Command, frame};
use crate::types::Snapshot;

/// Builds the model for a device from its advertised name.
///
/// Bluetti devices advertise as `<type><serial>`, e.g. `AC3002235000123456`.
/// Returns `None` when the name matches no supported type.
#[must_use]
pub fn build_device(address: impl Into<String>, name: &str) -> Option<DeviceModel> {
    let definition = MODELS.iter().copied().find(|definition| {
        name.strip_prefix(definition.type_name)
            .is_some_and(|serial| serial.bytes().all(|b| b.is_ascii_digit()))
    })?;

    Some(DeviceModel {
        address: address.into(),
        name: name.to_owned(),
        definition,
        polling_commands: definition
            .polling
            .iter()
            .map(|&(address, quantity)| Command::read_holding_registers(address, quantity))
            .collect(),
    })
}

/// A concrete device: its identity plus the register layout of its type.
#[derive(Debug, Clone)]
pub struct DeviceModel {
    address: String,
    name: String,
    definition: &'static ModelDefinition,
    polling_commands: Vec<Command>,
}

impl DeviceModel {
    /// Returns the BLE address the model was built for.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the advertised name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the device type, e.g. `AC300`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.definition.type_name
    }

    /// Returns the commands to issue on every poll, in order.
    #[must_use]
    pub fn polling_commands(&self) -> &[Command] {
        &self.polling_commands
    }

    /// Returns all fields of the model.
    #[must_use]
    pub const fn fields(&self) -> &'static [Field] {
        self.definition.fields
    }

    /// Decodes register data read from `starting_address`.
    ///
    /// Only fields lying entirely inside the read block are produced. When
    /// the model lists a field name twice, the later definition wins.
    pub fn decode(
        &self,
        starting_address: u16,
        data: &[u8],
    ) -> std::result::Result<Snapshot, DecodeError> {
        if data.len() % 2 != 0 {
            return Err(DecodeError::OddLength(data.len()));
        }

        let start = u32::from(starting_address);
        let end = start + (data.len() / 2) as u32;

        Ok(self
            .definition
            .fields
            .iter()
            .filter(|field| u32::from(field.address) >= start && field.end() <= end)
            .map(|field| {
                let offset = (u32::from(field.address) - start) as usize * 2;
                let len = usize::from(field.kind.registers()) * 2;
                (field.name, field.decode(&data[offset..offset + len]))
            })
            .collect())
    }

    /// Decodes a validated response frame to `command`.
    ///
    /// Checks that the byte count header agrees with the register quantity
    /// before decoding.
    pub fn decode_response(
        &self,
        command: &Command,
        validated: &[u8],
    ) -> std::result::Result<Snapshot, DecodeError> {
        let Some(quantity) = command.quantity() else {
            return Ok(Snapshot::new());
        };

        let data = frame::payload(command, validated);
        let expected = usize::from(quantity) * 2;
        let declared = validated.get(2).copied().map_or(0, usize::from);
        if data.len() != expected || declared != expected {
            return Err(DecodeError::LengthMismatch {
                expected,
                got: declared.min(data.len()),
            });
        }

        self.decode(command.starting_address(), data)
    }

    /// Builds a command setting a writable field to a raw register value.
    pub fn write_command(&self, field_name: &str, value: u16) -> Result<Command> {
        let field = self
            .definition
            .fields
            .iter()
            .rev()
            .find(|field| field.name == field_name)
            .ok_or_else(|| Error::UnknownField {
                name: field_name.to_owned(),
            })?;

        if !field.writable {
            return Err(Error::ReadOnlyField {
                name: field_name.to_owned(),
            });
        }

        Ok(Command::write_single_register(field.address, value))
    }
}
