// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial port enumeration, gated behind the `port-enumeration` feature
//! since it is not required on the Modbus RTU request/response path.

use crate::error::{Error, Result};

/// The kind of USB descriptor information available for a port, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortInfo {
    /// The OS device path or name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// A human-readable description, when the driver can supply one.
    pub description: Option<String>,
    /// The USB manufacturer string, when available.
    pub manufacturer: Option<String>,
    /// USB vendor id, when available.
    pub vid: Option<u16>,
    /// USB product id, when available.
    pub pid: Option<u16>,
}

/// Lists the serial ports visible to the OS.
///
/// # Errors
///
/// Returns [`Error::IoFailed`] if the OS port enumeration call itself
/// fails.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|err| Error::IoFailed(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
    Ok(ports.into_iter().map(Into::into).collect())
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => Self {
                port: info.port_name,
                description: usb.product,
                manufacturer: usb.manufacturer,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
            },
            _ => Self {
                port: info.port_name,
                ..Default::default()
            },
        }
    }
}
