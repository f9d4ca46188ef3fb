// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Library Error type

use std::fmt;

/// A specialized [`Result`] type for Modbus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One of the standard slave exception codes defined by the Modbus
/// application protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// 0x01 — the function code is not supported by the slave.
    IllegalFunction,
    /// 0x02 — the data address is not allowed for the slave.
    IllegalDataAddress,
    /// 0x03 — the contained value is not allowed for the slave.
    IllegalDataValue,
    /// 0x04 — the slave failed to perform the requested action.
    SlaveDeviceFailure,
    /// 0x05 — the slave accepted a long-running request.
    Acknowledge,
    /// 0x06 — the slave is busy processing a long-running request.
    SlaveDeviceBusy,
    /// 0x08 — a parity error was detected in extended memory.
    MemoryParityError,
    /// 0x0A — a gateway could not route the request.
    GatewayPathUnavailable,
    /// 0x0B — a gateway's target device did not respond.
    GatewayTargetDeviceFailedToRespond,
}

impl ErrorCode {
    pub(crate) const fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::SlaveDeviceFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::SlaveDeviceBusy,
            0x08 => Self::MemoryParityError,
            0x0A => Self::GatewayPathUnavailable,
            0x0B => Self::GatewayTargetDeviceFailedToRespond,
            _ => return None,
        })
    }

    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::SlaveDeviceFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::SlaveDeviceBusy => 0x06,
            Self::MemoryParityError => 0x08,
            Self::GatewayPathUnavailable => 0x0A,
            Self::GatewayTargetDeviceFailedToRespond => 0x0B,
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "illegal function",
            Self::IllegalDataAddress => "illegal data address",
            Self::IllegalDataValue => "illegal data value",
            Self::SlaveDeviceFailure => "slave device failure",
            Self::Acknowledge => "acknowledge",
            Self::SlaveDeviceBusy => "slave device busy",
            Self::MemoryParityError => "memory parity error",
            Self::GatewayPathUnavailable => "gateway path unavailable",
            Self::GatewayTargetDeviceFailedToRespond => "gateway target device failed to respond",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Returns `true` for the slave-originated error codes (0x01-0x0B), i.e.
/// the ones that can appear inside an exception frame.
#[must_use]
pub const fn is_standard_error_code(code: u8) -> bool {
    ErrorCode::from_u8(code).is_some()
}

/// The unified error taxonomy for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A slave exception frame was received, or (for `SlaveDeviceFailure`)
    /// a hard local I/O fault occurred.
    #[error("slave {slave} exception on function 0x{function:02X}: {code}")]
    Exception {
        /// The slave id carried by the exception frame.
        slave: u8,
        /// The (unmasked) function code the exception refers to.
        function: u8,
        /// The slave error code.
        code: ErrorCode,
    },

    /// The CRC trailer did not match the computed CRC of the frame.
    #[error("invalid CRC: expected 0x{expected:04X}, computed 0x{computed:04X}")]
    InvalidCrc {
        /// CRC carried by the frame.
        expected: u16,
        /// CRC computed over the frame's bytes.
        computed: u16,
    },

    /// The PDU was malformed, too short, or used an unrecognized function
    /// code.
    #[error("invalid byte order or malformed PDU: {0}")]
    InvalidByteOrder(String),

    /// A read or write quantity fell outside the bounds allowed for its
    /// function code.
    #[error("number of registers invalid: {0}")]
    NumberOfRegistersInvalid(String),

    /// An operation was attempted on a port that is not open.
    #[error("connection closed")]
    ConnectionClosed,

    /// The configured deadline elapsed before a complete frame arrived.
    #[error("timeout")]
    Timeout,

    /// The underlying serial driver reported an I/O failure.
    #[error("I/O failure: {0}")]
    IoFailed(#[from] std::io::Error),
}

impl Error {
    /// `true` for the slave-originated exception variant.
    #[must_use]
    pub const fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }
}
