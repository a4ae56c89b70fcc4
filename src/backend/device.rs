//! Device traits for the serial boundary
//!
//! This module provides the traits every line-oriented device implements,
//! enabling both real serial ports and mock devices for testing.
//!
//! - [`DeviceConnector`] opens a device by address and baud rate
//! - [`SerialDevice`] reads newline-terminated lines with a timeout

use crate::error::Result;
use std::time::Duration;

/// Result of a single bounded read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line (raw bytes, terminator may be included)
    Line(Vec<u8>),
    /// No complete line arrived within the read timeout
    Timeout,
}

/// An open line-oriented device
///
/// Implementations must be `Send` so the read loop can own the device on its
/// own thread. Any `Err` returned from [`read_line`](Self::read_line) is
/// treated as fatal for the session; timeouts must be reported as
/// [`ReadOutcome::Timeout`] instead.
pub trait SerialDevice: Send {
    /// Address the device was opened with
    fn address(&self) -> &str;

    /// Read one newline-delimited line, waiting at most the configured timeout
    fn read_line(&mut self) -> Result<ReadOutcome>;

    /// Release the underlying handle; must be safe to call more than once
    fn close(&mut self);

    /// Check if the handle is still held
    fn is_open(&self) -> bool;
}

/// Opens devices for the acquisition session
///
/// # Example
///
/// ```ignore
/// let device = connector.open("/dev/ttyACM0", 115200, Duration::from_millis(100))?;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait DeviceConnector: Send {
    /// Open `address` at `baud`, with reads bounded by `read_timeout`
    fn open(&self, address: &str, baud: u32, read_timeout: Duration)
        -> Result<Box<dyn SerialDevice>>;
}
