// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exception frame recognition, encoding and decoding.

use crate::{
    error::{Error, ErrorCode, Result},
    function::FunctionCode,
    util,
};

const EXCEPTION_BIT: u8 = 0x80;

/// A slave exception response: the requested function failed, and the
/// slave reports why instead of echoing a normal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exception {
    /// The address of the responding slave device.
    pub slave_id: u8,
    /// The function code the exception refers to (high bit masked off).
    pub function: FunctionCode,
    /// The slave error code.
    pub code: ErrorCode,
}

impl Exception {
    /// Constructs an exception.
    #[must_use]
    pub const fn new(slave_id: u8, function: FunctionCode, code: ErrorCode) -> Self {
        Self {
            slave_id,
            function,
            code,
        }
    }

    /// `true` iff `bytes` is long enough and its function byte has the
    /// high bit set, i.e. it carries an exception rather than a normal
    /// response.
    #[must_use]
    pub fn is_exception(bytes: &[u8]) -> bool {
        bytes.len() >= 2 && bytes[1] & EXCEPTION_BIT != 0
    }

    /// Encodes this exception's PDU, **without** the trailing CRC.
    #[must_use]
    pub fn to_raw(&self) -> Vec<u8> {
        vec![self.slave_id, self.function.as_u8() | EXCEPTION_BIT, self.code.as_u8()]
    }

    /// Decodes an exception PDU (without a trailing CRC).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidByteOrder`] if `bytes` is too short, is
    /// not actually an exception frame, uses an unrecognized function
    /// code, or carries an unrecognized error code.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 3 {
            return Err(Error::InvalidByteOrder(
                "exception PDU shorter than 3 bytes".to_owned(),
            ));
        }
        if !Self::is_exception(bytes) {
            return Err(Error::InvalidByteOrder(
                "function byte does not carry the exception bit".to_owned(),
            ));
        }
        let function = FunctionCode::from_u8(bytes[1] & !EXCEPTION_BIT).ok_or_else(|| {
            Error::InvalidByteOrder(format!(
                "unknown function code 0x{:02X}",
                bytes[1] & !EXCEPTION_BIT
            ))
        })?;
        let code = ErrorCode::from_u8(bytes[2])
            .ok_or_else(|| Error::InvalidByteOrder(format!("unknown error code 0x{:02X}", bytes[2])))?;
        Ok(Self::new(bytes[0], function, code))
    }

    /// Decodes an exception frame (PDU followed by a little-endian
    /// CRC-16), verifying the CRC.
    ///
    /// # Errors
    ///
    /// As [`Exception::from_raw`], plus [`Error::InvalidCrc`] if the
    /// trailing CRC does not match.
    pub fn from_raw_crc(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 5 {
            return Err(Error::InvalidByteOrder(
                "exception frame with CRC must be exactly 5 bytes".to_owned(),
            ));
        }
        util::check_crc(bytes)?;
        Self::from_raw(&bytes[..3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionCode::ReadAnalogOutputHoldingRegisters;

    #[test]
    fn recognizes_exception_bit() {
        assert!(Exception::is_exception(&[0x01, 0x83]));
        assert!(!Exception::is_exception(&[0x01, 0x03]));
        assert!(!Exception::is_exception(&[0x01]));
    }

    #[test]
    fn decode_fixture() {
        let mut framed = vec![0x01, 0x83, 0x02];
        let body = framed.clone();
        util::push_crc(&mut framed, &body);
        let exc = Exception::from_raw_crc(&framed).unwrap();
        assert_eq!(exc.slave_id, 1);
        assert_eq!(exc.function, ReadAnalogOutputHoldingRegisters);
        assert_eq!(exc.code, ErrorCode::IllegalDataAddress);
    }

    #[test]
    fn encode_decode_inverse() {
        let exc = Exception::new(5, ReadAnalogOutputHoldingRegisters, ErrorCode::SlaveDeviceBusy);
        assert_eq!(Exception::from_raw(&exc.to_raw()).unwrap(), exc);
    }

    #[test]
    fn rejects_non_exception_frame() {
        assert!(Exception::from_raw(&[0x01, 0x03, 0x02]).is_err());
    }

    #[test]
    fn rejects_unknown_error_code() {
        assert!(Exception::from_raw(&[0x01, 0x83, 0x7F]).is_err());
    }
}
