//! Acquisition session: one open device plus its read loop thread

use crate::config::SerialConfig;
use crate::error::{Result, SerialVisError};
use crate::session::SharedRecorder;
use crate::store::SharedBufferStore;
use crate::types::is_supported_baud;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::device::DeviceConnector;
use super::worker::{ReadLoop, SessionControl, SessionStats, SessionStatsSnapshot};
use super::{send_event, SessionEvent};

/// How often `close` checks whether the read loop has exited
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A live device connection with its background read loop
///
/// Dropping the session closes it.
pub struct AcquisitionSession {
    address: String,
    baud: u32,
    control: Arc<SessionControl>,
    stats: Arc<SessionStats>,
    handle: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for AcquisitionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionSession")
            .field("address", &self.address)
            .field("baud", &self.baud)
            .field("paused", &self.control.is_paused())
            .field("failed", &self.control.has_failed())
            .finish()
    }
}

impl AcquisitionSession {
    /// Open `address` and start the read loop
    ///
    /// The buffer store is cleared before the first line is read, so a new
    /// session never shows data from a previous one.
    pub fn open(
        connector: &dyn DeviceConnector,
        address: &str,
        baud: u32,
        serial: &SerialConfig,
        store: SharedBufferStore,
        recorder: SharedRecorder,
        events: Sender<SessionEvent>,
    ) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(SerialVisError::connect(address, "no device address given"));
        }
        if !is_supported_baud(baud) {
            return Err(SerialVisError::connect(
                address,
                format!("unsupported baud rate {}", baud),
            ));
        }

        let device = connector
            .open(address, baud, serial.read_timeout())
            .map_err(|e| match e {
                SerialVisError::Connect { .. } => e,
                other => SerialVisError::connect(address, other.to_string()),
            })?;

        store.clear();

        let control = Arc::new(SessionControl::default());
        let stats = Arc::new(SessionStats::default());
        let read_loop = ReadLoop::new(
            device,
            store,
            recorder,
            Arc::clone(&control),
            Arc::clone(&stats),
            events.clone(),
        );

        let handle = std::thread::Builder::new()
            .name("serialvis-read-loop".to_string())
            .spawn(move || read_loop.run())
            .map_err(|e| {
                SerialVisError::connect(address, format!("failed to spawn read loop: {}", e))
            })?;

        send_event(
            &events,
            SessionEvent::Connected {
                address: address.to_string(),
                baud,
            },
        );
        tracing::info!("Connected to {} at {} baud", address, baud);

        Ok(Self {
            address: address.to_string(),
            baud,
            control,
            stats,
            handle: Some(handle),
            shutdown_timeout: serial.shutdown_timeout(),
        })
    }

    /// Device address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Baud rate
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Drop parsed rows until resumed
    pub fn pause(&self) {
        self.control.set_paused(true);
    }

    /// Resume applying parsed rows
    pub fn resume(&self) {
        self.control.set_paused(false);
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Check if the read loop ended on a device error
    pub fn has_failed(&self) -> bool {
        self.control.has_failed()
    }

    /// Check if the read loop thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Current read loop counters
    pub fn stats(&self) -> SessionStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the read loop and wait for it to release the device
    ///
    /// Waits at most the configured shutdown timeout; a loop that has not
    /// exited by then is detached. Safe to call more than once.
    pub fn close(&mut self) {
        self.control.request_stop();
        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = Instant::now() + self.shutdown_timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(JOIN_POLL_INTERVAL);
        }

        if handle.is_finished() {
            if handle.join().is_err() {
                tracing::error!("Read loop for {} panicked", self.address);
            }
            tracing::info!("Disconnected from {}", self.address);
        } else {
            tracing::warn!(
                "Read loop for {} did not stop within {:?}, detaching",
                self.address,
                self.shutdown_timeout
            );
        }
    }
}

impl Drop for AcquisitionSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, feature = "mock-device"))]
mod tests {
    use super::*;
    use crate::backend::mock_device::MockConnector;
    use crate::session::Recorder;
    use crate::store::ChannelBufferStore;

    fn serial() -> SerialConfig {
        SerialConfig {
            read_timeout_ms: 10,
            ..SerialConfig::default()
        }
    }

    fn store() -> SharedBufferStore {
        ChannelBufferStore::shared(vec!["A6".into(), "A7".into()], 10)
    }

    #[test]
    fn test_open_validates_address_and_baud() {
        let (connector, _feed) = MockConnector::scripted();
        let (tx, _rx) = crossbeam_channel::bounded(8);

        for (address, baud) in [("", 9600), ("   ", 9600), ("mock0", 0), ("mock0", 1234)] {
            let result = AcquisitionSession::open(
                &connector,
                address,
                baud,
                &serial(),
                store(),
                Recorder::shared(),
                tx.clone(),
            );
            assert!(matches!(result, Err(SerialVisError::Connect { .. })));
        }
        assert_eq!(connector.open_count(), 0);
    }

    #[test]
    fn test_open_clears_store_and_close_is_idempotent() {
        let (connector, _feed) = MockConnector::scripted();
        let (tx, rx) = crossbeam_channel::bounded(8);
        let store = store();
        store.append(&[1.0, 2.0]);

        let mut session = AcquisitionSession::open(
            &connector,
            "mock0",
            9600,
            &serial(),
            Arc::clone(&store),
            Recorder::shared(),
            tx,
        )
        .unwrap();
        assert!(store.snapshot().is_empty());
        assert!(session.is_running());

        session.close();
        session.close();
        assert!(!session.is_running());
        assert_eq!(connector.close_count(), 1);

        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(SessionEvent::Connected { .. })));
        assert!(matches!(events.last(), Some(SessionEvent::Disconnected { .. })));
    }

    #[test]
    fn test_open_succeeds_with_full_event_queue() {
        let (connector, feed) = MockConnector::scripted();
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(SessionEvent::RecordingError("stale".into())).unwrap();
        let store = store();

        let mut session = AcquisitionSession::open(
            &connector,
            "mock0",
            9600,
            &serial(),
            Arc::clone(&store),
            Recorder::shared(),
            tx,
        )
        .unwrap();
        assert!(session.is_running());

        feed.send_row(&[1.0, 2.0]);
        let deadline = Instant::now() + Duration::from_secs(2);
        while store.total_rows() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(store.total_rows(), 1);

        session.close();
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![SessionEvent::RecordingError("stale".into())]
        );
    }

    #[test]
    fn test_pause_flag() {
        let (connector, _feed) = MockConnector::scripted();
        let (tx, _rx) = crossbeam_channel::bounded(8);
        let session = AcquisitionSession::open(
            &connector,
            "mock0",
            9600,
            &serial(),
            store(),
            Recorder::shared(),
            tx,
        )
        .unwrap();

        assert!(!session.is_paused());
        session.pause();
        assert!(session.is_paused());
        session.resume();
        assert!(!session.is_paused());
    }
}
