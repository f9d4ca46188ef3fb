// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The closed set of public Modbus function codes this crate speaks.

use std::fmt;

/// Which half of a request/response pair a function code belongs to, as
/// far as PDU shape goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    /// Read N coils/registers starting at an address.
    Read,
    /// Write exactly one coil/register.
    WriteSingle,
    /// Write N coils/registers starting at an address.
    WriteMultiple,
}

/// Whether a function code addresses coils (single bits) or registers
/// (16-bit words).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// A single readable/writable bit.
    Coil,
    /// A 16-bit readable/writable word.
    Register,
}

/// One of the public Modbus function codes supported by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FunctionCode {
    /// 0x01 — Read Coils
    ReadDiscreteOutputCoils,
    /// 0x02 — Read Discrete Inputs
    ReadDiscreteInputContacts,
    /// 0x03 — Read Holding Registers
    ReadAnalogOutputHoldingRegisters,
    /// 0x04 — Read Input Registers
    ReadAnalogInputRegisters,
    /// 0x05 — Write Single Coil
    WriteSingleDiscreteOutputCoil,
    /// 0x06 — Write Single Register
    WriteSingleAnalogOutputRegister,
    /// 0x0F — Write Multiple Coils
    WriteMultipleDiscreteOutputCoils,
    /// 0x10 — Write Multiple Registers
    WriteMultipleAnalogOutputHoldingRegisters,
}

impl FunctionCode {
    /// Parses a raw (non-exception) function code byte.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            0x01 => Self::ReadDiscreteOutputCoils,
            0x02 => Self::ReadDiscreteInputContacts,
            0x03 => Self::ReadAnalogOutputHoldingRegisters,
            0x04 => Self::ReadAnalogInputRegisters,
            0x05 => Self::WriteSingleDiscreteOutputCoil,
            0x06 => Self::WriteSingleAnalogOutputRegister,
            0x0F => Self::WriteMultipleDiscreteOutputCoils,
            0x10 => Self::WriteMultipleAnalogOutputHoldingRegisters,
            _ => return None,
        })
    }

    /// Returns the raw function code byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ReadDiscreteOutputCoils => 0x01,
            Self::ReadDiscreteInputContacts => 0x02,
            Self::ReadAnalogOutputHoldingRegisters => 0x03,
            Self::ReadAnalogInputRegisters => 0x04,
            Self::WriteSingleDiscreteOutputCoil => 0x05,
            Self::WriteSingleAnalogOutputRegister => 0x06,
            Self::WriteMultipleDiscreteOutputCoils => 0x0F,
            Self::WriteMultipleAnalogOutputHoldingRegisters => 0x10,
        }
    }

    /// The PDU shape class (Read / WriteSingle / WriteMultiple).
    #[must_use]
    pub const fn class(self) -> FunctionClass {
        match self {
            Self::ReadDiscreteOutputCoils
            | Self::ReadDiscreteInputContacts
            | Self::ReadAnalogOutputHoldingRegisters
            | Self::ReadAnalogInputRegisters => FunctionClass::Read,
            Self::WriteSingleDiscreteOutputCoil | Self::WriteSingleAnalogOutputRegister => {
                FunctionClass::WriteSingle
            }
            Self::WriteMultipleDiscreteOutputCoils
            | Self::WriteMultipleAnalogOutputHoldingRegisters => FunctionClass::WriteMultiple,
        }
    }

    /// Whether this function code addresses coils or registers.
    #[must_use]
    pub const fn register_kind(self) -> RegisterKind {
        match self {
            Self::ReadDiscreteOutputCoils
            | Self::ReadDiscreteInputContacts
            | Self::WriteSingleDiscreteOutputCoil
            | Self::WriteMultipleDiscreteOutputCoils => RegisterKind::Coil,
            Self::ReadAnalogOutputHoldingRegisters
            | Self::ReadAnalogInputRegisters
            | Self::WriteSingleAnalogOutputRegister
            | Self::WriteMultipleAnalogOutputHoldingRegisters => RegisterKind::Register,
        }
    }

    /// The inclusive quantity bounds allowed for this function code,
    /// whether it appears as a `Read` request's `quantity` or a
    /// `WriteMultiple` request's coil/register count.
    #[must_use]
    pub const fn read_quantity_bounds(self) -> (u16, u16) {
        match self.register_kind() {
            RegisterKind::Coil => (1, 2000),
            RegisterKind::Register => (1, 125),
        }
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} (0x{:02X})", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_codes() {
        for code in [
            FunctionCode::ReadDiscreteOutputCoils,
            FunctionCode::ReadDiscreteInputContacts,
            FunctionCode::ReadAnalogOutputHoldingRegisters,
            FunctionCode::ReadAnalogInputRegisters,
            FunctionCode::WriteSingleDiscreteOutputCoil,
            FunctionCode::WriteSingleAnalogOutputRegister,
            FunctionCode::WriteMultipleDiscreteOutputCoils,
            FunctionCode::WriteMultipleAnalogOutputHoldingRegisters,
        ] {
            assert_eq!(FunctionCode::from_u8(code.as_u8()), Some(code));
        }
        assert_eq!(FunctionCode::from_u8(0x07), None);
    }

    #[test]
    fn classification() {
        assert_eq!(
            FunctionCode::ReadAnalogInputRegisters.class(),
            FunctionClass::Read
        );
        assert_eq!(
            FunctionCode::WriteSingleDiscreteOutputCoil.register_kind(),
            RegisterKind::Coil
        );
        assert_eq!(
            FunctionCode::ReadDiscreteOutputCoils.read_quantity_bounds(),
            (1, 2000)
        );
        assert_eq!(
            FunctionCode::ReadAnalogInputRegisters.read_quantity_bounds(),
            (1, 125)
        );
    }
}
