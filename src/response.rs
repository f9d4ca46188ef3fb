// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response PDU construction, encoding and decoding.

use crate::{
    cell::Cell,
    error::{Error, Result},
    function::{FunctionClass, FunctionCode, RegisterKind},
    util,
};

/// A Modbus response, as sent from a slave back to the master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The address of the responding slave device.
    pub slave_id: u8,
    /// The function code this response answers.
    pub function: FunctionCode,
    /// The starting coil/register address. Zero for `Read` responses,
    /// which do not transmit it on the wire.
    pub address: u16,
    /// Number of coils/registers covered by this response.
    pub quantity: u16,
    /// The returned values; empty for `WriteMultiple` echoes.
    pub values: Vec<Cell>,
}

impl Response {
    /// Builds a `Read` response carrying `values`.
    #[must_use]
    pub fn read(slave_id: u8, function: FunctionCode, values: Vec<Cell>) -> Self {
        let quantity = values.len() as u16;
        Self {
            slave_id,
            function,
            address: 0,
            quantity,
            values,
        }
    }

    /// Builds a `WriteSingle` echo response.
    #[must_use]
    pub fn write_single(slave_id: u8, function: FunctionCode, address: u16, value: Cell) -> Self {
        Self {
            slave_id,
            function,
            address,
            quantity: 1,
            values: vec![value],
        }
    }

    /// Builds a `WriteMultiple` echo response.
    #[must_use]
    pub fn write_multiple(
        slave_id: u8,
        function: FunctionCode,
        address: u16,
        quantity: u16,
    ) -> Self {
        Self {
            slave_id,
            function,
            address,
            quantity,
            values: Vec::new(),
        }
    }

    /// Encodes this response's PDU, **without** the trailing CRC.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumberOfRegistersInvalid`] if the payload's byte
    /// count would exceed 255.
    pub fn to_raw(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(5 + self.values.len() * 2);
        out.push(self.slave_id);
        out.push(self.function.as_u8());
        match self.function.class() {
            FunctionClass::Read => match self.function.register_kind() {
                RegisterKind::Coil => {
                    let coils: Vec<bool> = self.values.iter().map(|c| c.as_coil()).collect();
                    let byte_count = util::packed_coils_len(coils.len());
                    check_byte_count(byte_count)?;
                    out.push(byte_count as u8);
                    util::pack_coils(&mut out, &coils);
                }
                RegisterKind::Register => {
                    let byte_count = self.values.len() * 2;
                    check_byte_count(byte_count)?;
                    out.push(byte_count as u8);
                    for cell in &self.values {
                        util::push_u16(&mut out, cell.as_register());
                    }
                }
            },
            FunctionClass::WriteSingle => {
                util::push_u16(&mut out, self.address);
                match self.values[0] {
                    Cell::Coil(state) => util::push_u16(&mut out, util::bool_to_u16_coil(state)),
                    Cell::Register(value) => util::push_u16(&mut out, value),
                }
            }
            FunctionClass::WriteMultiple => {
                util::push_u16(&mut out, self.address);
                util::push_u16(&mut out, self.quantity);
            }
        }
        Ok(out)
    }

    /// Decodes a response PDU (without a trailing CRC).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidByteOrder`] if `bytes` is too short, uses
    /// an unrecognized function code, or declares a byte count that
    /// disagrees with the remaining buffer.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let len = pdu_len(bytes)?;
        Self::from_raw_pdu(&bytes[..len])
    }

    /// Decodes a response frame (PDU followed by a little-endian CRC-16),
    /// verifying the CRC.
    ///
    /// # Errors
    ///
    /// As [`Response::from_raw`], plus [`Error::InvalidCrc`] if the
    /// trailing CRC does not match.
    pub fn from_raw_crc(bytes: &[u8]) -> Result<Self> {
        let len = pdu_len(bytes)?;
        if bytes.len() != len + 2 {
            return Err(Error::InvalidByteOrder(
                "trailing bytes after response PDU + CRC".to_owned(),
            ));
        }
        util::check_crc(bytes)?;
        Self::from_raw_pdu(&bytes[..len])
    }

    fn from_raw_pdu(bytes: &[u8]) -> Result<Self> {
        let slave_id = bytes[0];
        let function = FunctionCode::from_u8(bytes[1])
            .ok_or_else(|| Error::InvalidByteOrder(format!("unknown function code 0x{:02X}", bytes[1])))?;
        match function.class() {
            FunctionClass::Read => {
                let byte_count = usize::from(bytes[2]);
                if bytes.len() < 3 + byte_count {
                    return Err(Error::InvalidByteOrder(
                        "byte count exceeds remaining response buffer".to_owned(),
                    ));
                }
                let payload = &bytes[3..3 + byte_count];
                let values = match function.register_kind() {
                    RegisterKind::Coil => {
                        let n = byte_count * 8;
                        util::unpack_coils(payload, n).into_iter().map(Cell::coil).collect()
                    }
                    RegisterKind::Register => {
                        let n = byte_count / 2;
                        (0..n)
                            .map(|i| Cell::register_(util::big_endian_u16(&payload[i * 2..i * 2 + 2])))
                            .collect()
                    }
                };
                Ok(Self::read(slave_id, function, values))
            }
            FunctionClass::WriteSingle => {
                let address = util::big_endian_u16(&bytes[2..4]);
                let value = match function.register_kind() {
                    RegisterKind::Coil => Cell::coil(bytes[4] == 0xFF),
                    RegisterKind::Register => Cell::register_(util::big_endian_u16(&bytes[4..6])),
                };
                Ok(Self::write_single(slave_id, function, address, value))
            }
            FunctionClass::WriteMultiple => {
                let address = util::big_endian_u16(&bytes[2..4]);
                let quantity = util::big_endian_u16(&bytes[4..6]);
                Ok(Self::write_multiple(slave_id, function, address, quantity))
            }
        }
    }
}

fn check_byte_count(byte_count: usize) -> Result<()> {
    if byte_count > 255 {
        Err(Error::NumberOfRegistersInvalid(format!(
            "byte count {byte_count} exceeds 255"
        )))
    } else {
        Ok(())
    }
}

/// Computes the exact PDU length (excluding any CRC) for a response
/// buffer, based on its function code and, for `Read`, its declared byte
/// count.
pub(crate) fn pdu_len(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < 2 {
        return Err(Error::InvalidByteOrder("response PDU shorter than 2 bytes".to_owned()));
    }
    let function = FunctionCode::from_u8(bytes[1])
        .ok_or_else(|| Error::InvalidByteOrder(format!("unknown function code 0x{:02X}", bytes[1])))?;
    Ok(match function.class() {
        FunctionClass::Read => {
            if bytes.len() < 3 {
                return Err(Error::InvalidByteOrder(
                    "Read response PDU shorter than 3 bytes".to_owned(),
                ));
            }
            3 + usize::from(bytes[2])
        }
        FunctionClass::WriteSingle | FunctionClass::WriteMultiple => 6,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionCode::*;

    #[test]
    fn read_coils_encode() {
        let resp = Response::read(
            1,
            ReadDiscreteOutputCoils,
            vec![Cell::coil(true), Cell::coil(false), Cell::coil(true)],
        );
        assert_eq!(resp.to_raw().unwrap(), vec![0x01, 0x01, 0x01, 0b0000_0101]);
    }

    #[test]
    fn read_registers_round_trip() {
        let resp = Response::read(
            1,
            ReadAnalogInputRegisters,
            vec![Cell::register_(0xFFFF)],
        );
        let raw = resp.to_raw().unwrap();
        assert_eq!(raw, vec![0x01, 0x04, 0x02, 0xFF, 0xFF]);

        let mut framed = raw.clone();
        util::push_crc(&mut framed, &raw);
        let decoded = Response::from_raw_crc(&framed).unwrap();
        assert_eq!(decoded.values, resp.values);
        assert_eq!(decoded.address, 0);
    }

    #[test]
    fn coil_count_rounds_up_to_byte_boundary() {
        // 3 coils requested, but a byte carries 8 bits: parser reports 8.
        let raw = [0x01, 0x01, 0x01, 0b0000_0101];
        let resp = Response::from_raw(&raw).unwrap();
        assert_eq!(resp.quantity, 8);
        assert_eq!(resp.values.len(), 8);
    }

    #[test]
    fn write_single_coil_strict_echo_roundtrip() {
        let resp = Response::write_single(1, WriteSingleDiscreteOutputCoil, 0x00AC, Cell::coil(true));
        assert_eq!(resp.to_raw().unwrap(), vec![0x01, 0x05, 0x00, 0xAC, 0xFF, 0x00]);
    }

    #[test]
    fn write_single_coil_decode_is_tolerant() {
        // Per the compatibility rule, only the high byte matters, and any
        // value other than 0xFF decodes as "off".
        let raw = [0x01, 0x05, 0x00, 0xAC, 0xFF, 0x00];
        assert_eq!(
            Response::from_raw(&raw).unwrap().values[0],
            Cell::coil(true)
        );
        let raw_off = [0x01, 0x05, 0x00, 0xAC, 0x00, 0x00];
        assert_eq!(
            Response::from_raw(&raw_off).unwrap().values[0],
            Cell::coil(false)
        );
        let raw_garbage = [0x01, 0x05, 0x00, 0xAC, 0x7F, 0x00];
        assert_eq!(
            Response::from_raw(&raw_garbage).unwrap().values[0],
            Cell::coil(false)
        );
    }

    #[test]
    fn write_multiple_echo_has_no_values() {
        let resp = Response::write_multiple(1, WriteMultipleAnalogOutputHoldingRegisters, 0x0001, 2);
        assert_eq!(resp.to_raw().unwrap(), vec![0x01, 0x10, 0x00, 0x01, 0x00, 0x02]);
        let decoded = Response::from_raw(&resp.to_raw().unwrap()).unwrap();
        assert!(decoded.values.is_empty());
        assert_eq!(decoded.quantity, 2);
    }

    #[test]
    fn byte_count_overrun_is_rejected() {
        let raw = [0x01, 0x03, 0x05, 0x00, 0x00];
        assert!(matches!(Response::from_raw(&raw), Err(Error::InvalidByteOrder(_))));
    }

    #[test]
    fn from_raw_crc_detects_corruption() {
        let resp = Response::read(1, ReadAnalogInputRegisters, vec![Cell::register_(1)]);
        let raw = resp.to_raw().unwrap();
        let mut framed = raw.clone();
        util::push_crc(&mut framed, &raw);
        framed[2] ^= 0xFF;
        assert!(matches!(Response::from_raw_crc(&framed), Err(Error::InvalidCrc { .. })));
    }
}
