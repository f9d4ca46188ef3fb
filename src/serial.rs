// SPDX-FileCopyrightText: The modbus-rtu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A blocking serial port driver with a background single-byte ingest
//! thread, matching the [`serialport`] crate to a bounded ring buffer so
//! callers can issue deadline-bounded reads from any thread.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Size of the ring buffer the ingest thread deposits received bytes
/// into. Once full, the oldest byte is dropped to make room for the
/// newest.
const READING_BUFFER_SIZE: usize = 4096;

/// How long a single ingest-thread read blocks before it re-checks
/// whether the port has been closed.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Serial parity setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit.
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    /// One stop bit.
    One,
    /// One and a half stop bits. Not representable by the underlying
    /// driver; [`SerialPort::set_stop_bits`] rejects it.
    OnePointFive,
    /// Two stop bits.
    Two,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// No flow control.
    None,
    /// RTS/CTS hardware flow control.
    Hardware,
    /// XON/XOFF software flow control.
    Software,
}

impl From<Parity> for serialport::Parity {
    fn from(value: Parity) -> Self {
        match value {
            Parity::None => Self::None,
            Parity::Odd => Self::Odd,
            Parity::Even => Self::Even,
        }
    }
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(value: FlowControl) -> Self {
        match value {
            FlowControl::None => Self::None,
            FlowControl::Hardware => Self::Hardware,
            FlowControl::Software => Self::Software,
        }
    }
}

struct RingBuffer {
    data: VecDeque<u8>,
    /// `0` when no reader is waiting; otherwise the number of bytes a
    /// pending `read`/`read_line` call still needs.
    num_required: usize,
    /// Sentinel `num_required` used by `read_line` to mean "wake me on
    /// any `\n`, regardless of total length".
    waiting_for_newline: bool,
}

impl RingBuffer {
    fn new() -> Self {
        Self {
            data: VecDeque::with_capacity(READING_BUFFER_SIZE),
            num_required: 0,
            waiting_for_newline: false,
        }
    }

    fn push(&mut self, byte: u8) {
        if self.data.len() == READING_BUFFER_SIZE {
            self.data.pop_front();
        }
        self.data.push_back(byte);
    }
}

struct Shared {
    state: Mutex<RingBuffer>,
    cond: Condvar,
    closed: AtomicBool,
}

fn ingest_loop(mut reader: Box<dyn serialport::SerialPort>, shared: Arc<Shared>) {
    use io::Read as _;
    let mut one_byte = [0u8; 1];
    loop {
        if shared.closed.load(Ordering::Acquire) {
            return;
        }
        match reader.read(&mut one_byte) {
            Ok(0) => continue,
            Ok(_) => {
                let mut state = shared.state.lock().unwrap();
                state.push(one_byte[0]);
                let wake = state.num_required > 0
                    && (state.data.len() >= state.num_required
                        || (state.waiting_for_newline && one_byte[0] == b'\n'));
                drop(state);
                if wake {
                    shared.cond.notify_one();
                }
            }
            Err(err) if matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                continue;
            }
            Err(_) => {
                shared.closed.store(true, Ordering::Release);
                shared.cond.notify_all();
                return;
            }
        }
    }
}

/// A serial port opened for blocking reads and writes.
///
/// Reads are serviced by a background thread performing single-byte
/// reads into a bounded ring buffer; [`SerialPort::read`] drains that
/// buffer under a deadline instead of blocking directly on the OS
/// handle, which is what lets [`crate::connection::Connection`] bound
/// its total per-call latency.
pub struct SerialPort {
    writer: Mutex<Option<Box<dyn serialport::SerialPort>>>,
    shared: Arc<Shared>,
    ingest: Mutex<Option<JoinHandle<()>>>,
}

impl SerialPort {
    /// Opens `path` at the given initial baud rate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoFailed`] if the underlying driver cannot open
    /// or clone the port.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(POLL_TIMEOUT)
            .open()
            .map_err(driver_err)?;
        let reader = port.try_clone().map_err(driver_err)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(RingBuffer::new()),
            cond: Condvar::new(),
            closed: AtomicBool::new(false),
        });
        let ingest_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("modbus-rtu-serial-ingest".to_owned())
            .spawn(move || ingest_loop(reader, ingest_shared))
            .map_err(|err| Error::IoFailed(io::Error::new(io::ErrorKind::Other, err)))?;

        log::debug!("opened serial port {path} at {baud_rate} baud");

        Ok(Self {
            writer: Mutex::new(Some(port)),
            shared,
            ingest: Mutex::new(Some(handle)),
        })
    }

    /// `true` while the port is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.writer.lock().unwrap().is_some() && !self.shared.closed.load(Ordering::Acquire)
    }

    /// Closes the port and joins the ingest thread.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.cond.notify_all();
        self.writer.lock().unwrap().take();
        if let Some(handle) = self.ingest.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Sets the baud rate. Returns `false` if the driver rejects it.
    pub fn set_baud_rate(&self, baud_rate: u32) -> bool {
        self.with_port_mut(|port| port.set_baud_rate(baud_rate).is_ok())
    }

    /// Sets the character size in bits (5-8). Returns `false` if the
    /// driver rejects it.
    pub fn set_data_bits(&self, data_bits: u32) -> bool {
        let Some(bits) = (match data_bits {
            5 => Some(serialport::DataBits::Five),
            6 => Some(serialport::DataBits::Six),
            7 => Some(serialport::DataBits::Seven),
            8 => Some(serialport::DataBits::Eight),
            _ => None,
        }) else {
            return false;
        };
        self.with_port_mut(|port| port.set_data_bits(bits).is_ok())
    }

    /// Sets the parity mode.
    pub fn set_parity(&self, parity: Parity) -> bool {
        self.with_port_mut(|port| port.set_parity(parity.into()).is_ok())
    }

    /// Sets the number of stop bits. Returns `false` for
    /// [`StopBits::OnePointFive`], which the underlying driver cannot
    /// express.
    pub fn set_stop_bits(&self, stop_bits: StopBits) -> bool {
        let bits = match stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
            StopBits::OnePointFive => return false,
        };
        self.with_port_mut(|port| port.set_stop_bits(bits).is_ok())
    }

    /// Sets the flow control mode.
    pub fn set_flow_control(&self, flow_control: FlowControl) -> bool {
        self.with_port_mut(|port| port.set_flow_control(flow_control.into()).is_ok())
    }

    fn with_port_mut(&self, f: impl FnOnce(&mut Box<dyn serialport::SerialPort>) -> bool) -> bool {
        match self.writer.lock().unwrap().as_mut() {
            Some(port) => f(port),
            None => false,
        }
    }

    /// Writes `data` in one call. Returns the number of bytes written,
    /// or `-1` if the port is closed or the driver reports an error.
    pub fn write(&self, data: &[u8]) -> i32 {
        use io::Write as _;
        let mut guard = self.writer.lock().unwrap();
        match guard.as_mut() {
            Some(port) => match port.write(data) {
                Ok(n) => n as i32,
                Err(_) => -1,
            },
            None => -1,
        }
    }

    /// Drains up to `buf.len()` bytes from the ring buffer, waiting up
    /// to `deadline_ms` (or indefinitely if `u32::MAX`) for enough bytes
    /// to accumulate. Returns the number of bytes actually written to
    /// `buf`, which may be less than `buf.len()` on timeout.
    pub fn read(&self, buf: &mut [u8], deadline_ms: u32) -> i32 {
        let deadline = absolute_deadline(deadline_ms);
        let mut state = self.shared.state.lock().unwrap();
        state.num_required = buf.len();
        state.waiting_for_newline = false;

        let mut num_read = 0;
        loop {
            num_read += drain(&mut state, &mut buf[num_read..]);
            if num_read >= buf.len() {
                break;
            }
            if self.shared.closed.load(Ordering::Acquire) {
                break;
            }
            match remaining(deadline) {
                Some(remaining) => {
                    let (guard, timed_out) = self.shared.cond.wait_timeout(state, remaining).unwrap();
                    state = guard;
                    if timed_out.timed_out() && state.data.is_empty() {
                        break;
                    }
                }
                None => break,
                // `None` distinguishes "deadline already passed" from "wait
                // and recheck"; see `remaining`.
            }
        }
        state.num_required = 0;
        num_read as i32
    }

    /// Like [`SerialPort::read`], but stops at (and includes) the first
    /// `\n` seen, or when `buf` fills, whichever comes first. Used only
    /// by ASCII diagnostic subprotocols; the Modbus RTU path never calls
    /// this.
    pub fn read_line(&self, buf: &mut [u8], deadline_ms: u32) -> i32 {
        let deadline = absolute_deadline(deadline_ms);
        let mut state = self.shared.state.lock().unwrap();
        state.num_required = 1;
        state.waiting_for_newline = true;

        let mut num_read = 0;
        loop {
            while num_read < buf.len() {
                let Some(byte) = state.data.pop_front() else {
                    break;
                };
                buf[num_read] = byte;
                num_read += 1;
                if byte == b'\n' {
                    state.num_required = 0;
                    return num_read as i32;
                }
            }
            if num_read >= buf.len() {
                break;
            }
            match remaining(deadline) {
                Some(remaining) => {
                    let (guard, _timed_out) = self.shared.cond.wait_timeout(state, remaining).unwrap();
                    state = guard;
                }
                None => break,
            }
        }
        state.num_required = 0;
        num_read as i32
    }

    /// Discards any buffered but unread input.
    pub fn clear_inputs(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.data.clear();
        if let Some(port) = self.writer.lock().unwrap().as_mut() {
            let _ = port.clear(serialport::ClearBuffer::Input);
        }
    }

    /// Blocks until all written bytes have been transmitted by the
    /// underlying driver.
    pub fn flush(&self) -> Result<()> {
        use io::Write as _;
        match self.writer.lock().unwrap().as_mut() {
            Some(port) => port.flush().map_err(Error::IoFailed),
            None => Err(Error::ConnectionClosed),
        }
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        self.close();
    }
}

fn drain(state: &mut RingBuffer, buf: &mut [u8]) -> usize {
    let n = state.data.len().min(buf.len());
    for slot in buf.iter_mut().take(n) {
        *slot = state.data.pop_front().unwrap();
    }
    n
}

fn absolute_deadline(deadline_ms: u32) -> Option<Instant> {
    if deadline_ms == u32::MAX {
        None
    } else {
        Some(Instant::now() + Duration::from_millis(u64::from(deadline_ms)))
    }
}

/// `Some(duration)` to keep waiting, `None` once the deadline (if any)
/// has passed. A caller with no deadline always gets a long wait slice
/// so it keeps re-evaluating the ring buffer.
fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        None => Some(Duration::from_secs(3600)),
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                None
            } else {
                Some(deadline - now)
            }
        }
    }
}

fn driver_err(err: serialport::Error) -> Error {
    Error::IoFailed(io::Error::new(io::ErrorKind::Other, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Arc<Shared> {
        Arc::new(Shared {
            state: Mutex::new(RingBuffer::new()),
            cond: Condvar::new(),
            closed: AtomicBool::new(false),
        })
    }

    #[test]
    fn ring_buffer_overflow_drops_oldest() {
        let mut buf = RingBuffer::new();
        for i in 0..READING_BUFFER_SIZE + 10 {
            buf.push((i % 256) as u8);
        }
        assert_eq!(buf.data.len(), READING_BUFFER_SIZE);
        assert_eq!(buf.data.front().copied(), Some((10 % 256) as u8));
    }

    #[test]
    fn drain_partial_when_buffer_short() {
        let mut buf = RingBuffer::new();
        buf.push(1);
        buf.push(2);
        let mut out = [0u8; 5];
        let n = drain(&mut buf, &mut out);
        assert_eq!(n, 2);
        assert_eq!(&out[..2], &[1, 2]);
    }

    #[test]
    fn read_wakes_on_enough_bytes() {
        let shared = shared();
        let producer = Arc::clone(&shared);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let mut state = producer.state.lock().unwrap();
            for byte in [0xAA, 0xBB, 0xCC] {
                state.push(byte);
            }
            let wake = state.num_required > 0 && state.data.len() >= state.num_required;
            drop(state);
            if wake {
                producer.cond.notify_one();
            }
        });

        let port = TestPort { shared };
        let mut buf = [0u8; 3];
        let n = port.read(&mut buf, 1000);
        assert_eq!(n, 3);
        assert_eq!(buf, [0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn read_times_out_with_partial_data() {
        let shared = shared();
        {
            let mut state = shared.state.lock().unwrap();
            state.push(0x01);
        }
        let port = TestPort { shared };
        let mut buf = [0u8; 4];
        let n = port.read(&mut buf, 30);
        assert_eq!(n, 1);
        assert_eq!(buf[0], 0x01);
    }

    /// A minimal stand-in exposing the same read logic as `SerialPort`,
    /// without requiring a real OS-backed port to construct one.
    struct TestPort {
        shared: Arc<Shared>,
    }

    impl TestPort {
        fn read(&self, buf: &mut [u8], deadline_ms: u32) -> i32 {
            let deadline = absolute_deadline(deadline_ms);
            let mut state = self.shared.state.lock().unwrap();
            state.num_required = buf.len();
            state.waiting_for_newline = false;

            let mut num_read = 0;
            loop {
                num_read += drain(&mut state, &mut buf[num_read..]);
                if num_read >= buf.len() {
                    break;
                }
                match remaining(deadline) {
                    Some(remaining) => {
                        let (guard, timed_out) =
                            self.shared.cond.wait_timeout(state, remaining).unwrap();
                        state = guard;
                        if timed_out.timed_out() && state.data.is_empty() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            state.num_required = 0;
            num_read as i32
        }
    }
}
