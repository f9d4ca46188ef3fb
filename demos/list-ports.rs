// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lists the serial ports visible to the OS.

fn main() -> anyhow::Result<()> {
    env_logger::init();

    for port in modbus_rtu::list_ports()? {
        print!("{}", port.port);
        if let Some(description) = &port.description {
            print!("  ({description})");
        }
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            print!("  [{vid:04x}:{pid:04x}]");
        }
        println!();
    }

    Ok(())
}
