// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads a handful of holding registers from a slave device.

use anyhow::Context;
use clap::Parser;
use modbus_rtu::{Connection, FunctionCode, Request};

#[derive(Parser)]
struct Args {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Modbus slave address
    #[arg(long, default_value_t = 1)]
    slave: u8,

    /// Starting register address
    #[arg(long, default_value_t = 0)]
    address: u16,

    /// Number of registers to read
    #[arg(long, default_value_t = 2)]
    quantity: u16,

    /// Total per-call timeout, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut conn = Connection::connect(&args.port)
        .with_context(|| format!("failed to open {}", args.port))?;
    conn.set_timeout_ms(args.timeout_ms);

    let request = Request::read(
        args.slave,
        FunctionCode::ReadAnalogOutputHoldingRegisters,
        args.address,
        args.quantity,
    )?;

    let sent = conn.send_request(&request)?;
    log::debug!("sent {} bytes: {sent:02X?}", sent.len());

    let (response, raw) = conn.await_response()?;
    log::debug!("received {} bytes: {raw:02X?}", raw.len());

    for (i, value) in response.values.iter().enumerate() {
        println!("register[{}] = {value}", args.address as usize + i);
    }

    Ok(())
}
