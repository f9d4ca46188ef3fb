// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A blocking Modbus RTU master library for serial links.
//!
//! ```no_run
//! use modbus_rtu::{Connection, FunctionCode, Request};
//!
//! # fn main() -> modbus_rtu::error::Result<()> {
//! let conn = Connection::connect("/dev/ttyUSB0")?;
//! let req = Request::read(1, FunctionCode::ReadAnalogInputRegisters, 0, 2)?;
//! conn.send_request(&req)?;
//! let (response, _raw) = conn.await_response()?;
//! println!("{:?}", response.values);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod connection;
pub mod error;
pub mod exception;
pub mod function;
#[cfg(feature = "port-enumeration")]
pub mod ports;
pub mod request;
pub mod response;
pub mod serial;
pub mod util;

pub use cell::Cell;
pub use connection::Connection;
pub use error::{Error, ErrorCode, Result};
pub use exception::Exception;
pub use function::{FunctionClass, FunctionCode, RegisterKind};
#[cfg(feature = "port-enumeration")]
pub use ports::{list_ports, PortInfo};
pub use request::Request;
pub use response::Response;
pub use serial::{FlowControl, Parity, SerialPort, StopBits};
