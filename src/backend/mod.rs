//! Backend module for serial acquisition
//!
//! This module owns everything that touches a device. Each open session runs
//! its read loop on a dedicated thread; the rest of the program talks to it
//! through the shared buffer store, a few atomic flags and a bounded event
//! channel.
//!
//! # Architecture
//!
//! - [`DeviceConnector`] / [`SerialDevice`] - Traits at the hardware boundary
//! - [`SerialPortConnector`] - Real serial ports via the `serialport` crate
//! - [`MockConnector`] - Scripted or generated devices for testing (feature-gated)
//! - [`AcquisitionSession`] - Handle to one open device and its read loop
//! - [`ReadLoop`] - The loop that parses lines and fans rows out
//! - [`SessionEvent`] - Notifications sent from the read loop to the coordinator
//!
//! # Example
//!
//! ```ignore
//! use serialvis_rs::backend::{AcquisitionSession, SerialPortConnector};
//!
//! let (tx, rx) = crossbeam_channel::bounded(EVENT_QUEUE_SIZE);
//! let mut session = AcquisitionSession::open(
//!     &SerialPortConnector, "/dev/ttyACM0", 115200, &config.serial, store, recorder, tx,
//! )?;
//!
//! for event in rx.try_iter() {
//!     println!("{:?}", event);
//! }
//! session.close();
//! ```

pub mod acquisition;
pub mod device;
#[cfg(feature = "mock-device")]
pub mod mock_device;
pub mod serial;
pub mod worker;

pub use acquisition::AcquisitionSession;
pub use device::{DeviceConnector, ReadOutcome, SerialDevice};
#[cfg(feature = "mock-device")]
pub use mock_device::{MockConnector, MockDataPattern, MockFeed};
pub use serial::{SerialPortConnector, SerialPortDevice};
pub use worker::{ReadLoop, SessionControl, SessionStats, SessionStatsSnapshot};

use crossbeam_channel::{Sender, TrySendError};

/// Capacity of the session event channel
pub const EVENT_QUEUE_SIZE: usize = 256;

/// Message sent from a read loop to whoever owns the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Device opened and read loop started
    Connected {
        /// Device address
        address: String,
        /// Baud rate
        baud: u32,
    },
    /// Read loop exited and the device was released
    Disconnected {
        /// Device address
        address: String,
    },
    /// The device failed; the session is over
    DeviceError(String),
    /// A recording write failed; the recording was closed
    RecordingError(String),
}

/// Queue an event without blocking; a full queue drops it with a warning
pub(crate) fn send_event(events: &Sender<SessionEvent>, event: SessionEvent) {
    match events.try_send(event) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(event)) => {
            tracing::warn!("Session event queue full, dropping {:?}", event);
        }
    }
}

impl SessionEvent {
    /// Check if this event ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Disconnected { .. } | SessionEvent::DeviceError(_)
        )
    }
}
