// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request PDU construction, encoding and decoding.

use crate::{
    cell::Cell,
    error::{Error, Result},
    function::{FunctionClass, FunctionCode, RegisterKind},
    util,
};

/// A Modbus request, as sent from the master to a slave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The address of the target slave device.
    pub slave_id: u8,
    /// The function code to invoke.
    pub function: FunctionCode,
    /// The starting coil/register address.
    pub address: u16,
    /// Number of coils/registers affected.
    pub quantity: u16,
    /// The values to write; empty for `Read` requests.
    pub values: Vec<Cell>,
}

impl Request {
    /// Builds a `Read` request for `quantity` coils/registers starting at
    /// `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumberOfRegistersInvalid`] if `quantity` is
    /// outside the per-function-code bounds (1-2000 for coils, 1-125 for
    /// registers), or if `function` is not a `Read` function.
    pub fn read(slave_id: u8, function: FunctionCode, address: u16, quantity: u16) -> Result<Self> {
        Self::new(slave_id, function, address, quantity, Vec::new())
    }

    /// Builds a `WriteSingle` request for one coil/register at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if `function` is not a `WriteSingle` function or
    /// if `value`'s kind does not match the function's register kind.
    pub fn write_single(
        slave_id: u8,
        function: FunctionCode,
        address: u16,
        value: Cell,
    ) -> Result<Self> {
        Self::new(slave_id, function, address, 1, vec![value])
    }

    /// Builds a `WriteMultiple` request for `values.len()` coils/registers
    /// starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if `function` is not a `WriteMultiple` function, if
    /// `values.len()` is outside the per-function-code bounds (1-2000 for
    /// coils, 1-125 for registers), or if any value's kind does not match
    /// the function's register kind.
    pub fn write_multiple(
        slave_id: u8,
        function: FunctionCode,
        address: u16,
        values: Vec<Cell>,
    ) -> Result<Self> {
        let quantity = values.len() as u16;
        Self::new(slave_id, function, address, quantity, values)
    }

    /// Builds and validates a request for any function code, mirroring
    /// the invariants of the originating C++ `ModbusRequest` constructor.
    ///
    /// # Errors
    ///
    /// See [`Request::read`], [`Request::write_single`] and
    /// [`Request::write_multiple`].
    pub fn new(
        slave_id: u8,
        function: FunctionCode,
        address: u16,
        quantity: u16,
        values: Vec<Cell>,
    ) -> Result<Self> {
        match function.class() {
            FunctionClass::Read => {
                if !values.is_empty() {
                    return Err(Error::InvalidByteOrder(
                        "a Read request does not carry values".to_owned(),
                    ));
                }
                let (min, max) = function.read_quantity_bounds();
                if quantity < min || quantity > max {
                    return Err(Error::NumberOfRegistersInvalid(format!(
                        "quantity {quantity} out of range {min}..={max} for {function}"
                    )));
                }
            }
            FunctionClass::WriteSingle => {
                if quantity != 1 || values.len() != 1 {
                    return Err(Error::NumberOfRegistersInvalid(
                        "a WriteSingle request writes exactly one value".to_owned(),
                    ));
                }
                check_kinds(function.register_kind(), &values)?;
            }
            FunctionClass::WriteMultiple => {
                if values.len() != usize::from(quantity) {
                    return Err(Error::NumberOfRegistersInvalid(format!(
                        "quantity {quantity} does not match {} supplied values",
                        values.len()
                    )));
                }
                let (min, max) = function.read_quantity_bounds();
                if quantity < min || quantity > max {
                    return Err(Error::NumberOfRegistersInvalid(format!(
                        "quantity {quantity} out of range {min}..={max} for {function}"
                    )));
                }
                check_kinds(function.register_kind(), &values)?;
            }
        }
        Ok(Self {
            slave_id,
            function,
            address,
            quantity,
            values,
        })
    }

    /// Encodes this request's PDU, **without** the trailing CRC.
    #[must_use]
    pub fn to_raw(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.values.len() * 2);
        out.push(self.slave_id);
        out.push(self.function.as_u8());
        util::push_u16(&mut out, self.address);
        match self.function.class() {
            FunctionClass::Read => {
                util::push_u16(&mut out, self.quantity);
            }
            FunctionClass::WriteSingle => match self.values[0] {
                Cell::Coil(state) => util::push_u16(&mut out, util::bool_to_u16_coil(state)),
                Cell::Register(value) => util::push_u16(&mut out, value),
            },
            FunctionClass::WriteMultiple => {
                util::push_u16(&mut out, self.quantity);
                // `Request::new` bounds `quantity` to 1-2000 coils / 1-125
                // registers, so byte_count never exceeds 250 here.
                match self.function.register_kind() {
                    RegisterKind::Coil => {
                        let coils: Vec<bool> =
                            self.values.iter().map(|c| c.as_coil()).collect();
                        out.push(util::packed_coils_len(coils.len()) as u8);
                        util::pack_coils(&mut out, &coils);
                    }
                    RegisterKind::Register => {
                        out.push((self.values.len() * 2) as u8);
                        for cell in &self.values {
                            util::push_u16(&mut out, cell.as_register());
                        }
                    }
                }
            }
        }
        out
    }

    /// Decodes a request PDU (without a trailing CRC).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidByteOrder`] if `bytes` is too short, uses
    /// an unrecognized function code, or (for `WriteMultiple`) declares a
    /// byte count inconsistent with its quantity and register kind.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let len = pdu_len(bytes)?;
        Self::from_raw_pdu(&bytes[..len])
    }

    /// Decodes a request frame (PDU followed by a little-endian CRC-16),
    /// verifying the CRC.
    ///
    /// # Errors
    ///
    /// As [`Request::from_raw`], plus [`Error::InvalidCrc`] if the
    /// trailing CRC does not match.
    pub fn from_raw_crc(bytes: &[u8]) -> Result<Self> {
        let len = pdu_len(bytes)?;
        if bytes.len() != len + 2 {
            return Err(Error::InvalidByteOrder(
                "trailing bytes after request PDU + CRC".to_owned(),
            ));
        }
        util::check_crc(bytes)?;
        Self::from_raw_pdu(&bytes[..len])
    }

    fn from_raw_pdu(bytes: &[u8]) -> Result<Self> {
        let slave_id = bytes[0];
        let function = FunctionCode::from_u8(bytes[1])
            .ok_or_else(|| Error::InvalidByteOrder(format!("unknown function code 0x{:02X}", bytes[1])))?;
        let address = util::big_endian_u16(&bytes[2..4]);
        match function.class() {
            FunctionClass::Read => {
                let quantity = util::big_endian_u16(&bytes[4..6]);
                Self::new(slave_id, function, address, quantity, Vec::new())
            }
            FunctionClass::WriteSingle => {
                let raw = util::big_endian_u16(&bytes[4..6]);
                let value = match function.register_kind() {
                    RegisterKind::Coil => match raw {
                        0xFF00 => Cell::coil(true),
                        0x0000 => Cell::coil(false),
                        other => {
                            return Err(Error::InvalidByteOrder(format!(
                                "invalid coil value 0x{other:04X}"
                            )))
                        }
                    },
                    RegisterKind::Register => Cell::register_(raw),
                };
                Self::new(slave_id, function, address, 1, vec![value])
            }
            FunctionClass::WriteMultiple => {
                let quantity = util::big_endian_u16(&bytes[4..6]);
                let byte_count = bytes[6];
                let values = decode_write_multiple_payload(
                    function.register_kind(),
                    quantity,
                    byte_count,
                    &bytes[7..],
                )?;
                Self::new(slave_id, function, address, quantity, values)
            }
        }
    }
}

fn check_kinds(kind: RegisterKind, values: &[Cell]) -> Result<()> {
    let ok = values.iter().all(|cell| match kind {
        RegisterKind::Coil => cell.is_coil(),
        RegisterKind::Register => !cell.is_coil(),
    });
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidByteOrder(
            "value kind does not match the function's register kind".to_owned(),
        ))
    }
}

/// Unpacks a `WriteMultiple` request payload after validating its
/// declared byte count against `quantity` and `kind`.
fn decode_write_multiple_payload(
    kind: RegisterKind,
    quantity: u16,
    byte_count: u8,
    payload: &[u8],
) -> Result<Vec<Cell>> {
    match kind {
        RegisterKind::Coil => {
            let expected = util::packed_coils_len(usize::from(quantity));
            if usize::from(byte_count) != expected || payload.len() < expected {
                return Err(Error::InvalidByteOrder(format!(
                    "byte count {byte_count} inconsistent with {quantity} coils"
                )));
            }
            Ok(util::unpack_coils(payload, usize::from(quantity))
                .into_iter()
                .map(Cell::coil)
                .collect())
        }
        RegisterKind::Register => {
            let expected = usize::from(quantity) * 2;
            if usize::from(byte_count) != expected || payload.len() < expected {
                return Err(Error::InvalidByteOrder(format!(
                    "byte count {byte_count} inconsistent with {quantity} registers"
                )));
            }
            Ok((0..usize::from(quantity))
                .map(|i| Cell::register_(util::big_endian_u16(&payload[i * 2..i * 2 + 2])))
                .collect())
        }
    }
}

/// Computes the exact PDU length (excluding any CRC) for a request buffer,
/// based on its function code and, for `WriteMultiple`, its declared byte
/// count.
pub(crate) fn pdu_len(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < 6 {
        return Err(Error::InvalidByteOrder("request PDU shorter than 6 bytes".to_owned()));
    }
    let function = FunctionCode::from_u8(bytes[1])
        .ok_or_else(|| Error::InvalidByteOrder(format!("unknown function code 0x{:02X}", bytes[1])))?;
    Ok(match function.class() {
        FunctionClass::Read | FunctionClass::WriteSingle => 6,
        FunctionClass::WriteMultiple => {
            if bytes.len() < 7 {
                return Err(Error::InvalidByteOrder(
                    "WriteMultiple request PDU shorter than 7 bytes".to_owned(),
                ));
            }
            7 + usize::from(bytes[6])
        }
    })
}
