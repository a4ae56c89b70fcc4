//! Read Loop Thread Implementation
//!
//! This module contains the loop that runs on the session's background
//! thread. It owns the device handle and is the only writer of the channel
//! buffers.
//!
//! # Responsibilities
//!
//! - **Line reading**: bounded reads so the stop flag is re-checked at least
//!   once per read timeout
//! - **Parsing**: full-row parse; malformed lines are counted and dropped
//! - **Pause**: parsed rows are dropped while the pause flag is set
//! - **Fan-out**: accepted rows go to the buffer store and, while recording,
//!   to the recorder
//! - **Failure**: a device error ends the loop, stops the recording and is
//!   reported exactly once

use crate::session::{lock_recorder, SharedRecorder};
use crate::store::SharedBufferStore;
use crate::types::{parse_line_bytes, LineError};
use crossbeam_channel::Sender;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::device::{ReadOutcome, SerialDevice};
use super::{send_event, SessionEvent};

/// Flags shared between a session handle and its read loop
#[derive(Debug, Default)]
pub struct SessionControl {
    stop: AtomicBool,
    paused: AtomicBool,
    failed: AtomicBool,
}

impl SessionControl {
    /// Ask the loop to exit after the current read
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Check if a stop was requested
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Set or clear the pause flag
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Check if the loop ended on a device error
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }
}

/// Counters maintained by the read loop
#[derive(Debug)]
pub struct SessionStats {
    lines_read: AtomicU64,
    rows_accepted: AtomicU64,
    lines_rejected: AtomicU64,
    rows_dropped_paused: AtomicU64,
    rows_recorded: AtomicU64,
    timeouts: AtomicU64,
    started: Instant,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            lines_read: AtomicU64::new(0),
            rows_accepted: AtomicU64::new(0),
            lines_rejected: AtomicU64::new(0),
            rows_dropped_paused: AtomicU64::new(0),
            rows_recorded: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            started: Instant::now(),
        }
    }
}

impl SessionStats {
    /// Take a copy of the current counters
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        let elapsed = self.started.elapsed();
        let rows_accepted = self.rows_accepted.load(Ordering::SeqCst);
        let secs = elapsed.as_secs_f64();
        SessionStatsSnapshot {
            lines_read: self.lines_read.load(Ordering::SeqCst),
            rows_accepted,
            lines_rejected: self.lines_rejected.load(Ordering::SeqCst),
            rows_dropped_paused: self.rows_dropped_paused.load(Ordering::SeqCst),
            rows_recorded: self.rows_recorded.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::SeqCst),
            elapsed,
            effective_row_rate: if secs > 0.0 {
                rows_accepted as f64 / secs
            } else {
                0.0
            },
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Copy of the read loop counters at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStatsSnapshot {
    /// Lines received from the device (including discarded ones)
    pub lines_read: u64,
    /// Rows appended to the buffers
    pub rows_accepted: u64,
    /// Lines discarded as malformed
    pub lines_rejected: u64,
    /// Parsed rows dropped while paused
    pub rows_dropped_paused: u64,
    /// Rows written to the recorder
    pub rows_recorded: u64,
    /// Reads that timed out without a line
    pub timeouts: u64,
    /// Time since the session opened
    pub elapsed: Duration,
    /// Accepted rows per second since the session opened
    pub effective_row_rate: f64,
}

impl SessionStatsSnapshot {
    /// Percentage of received lines that were discarded as malformed
    pub fn reject_rate(&self) -> f64 {
        if self.lines_read == 0 {
            0.0
        } else {
            (self.lines_rejected as f64 / self.lines_read as f64) * 100.0
        }
    }
}

/// The loop that runs on the session thread
pub struct ReadLoop {
    device: Box<dyn SerialDevice>,
    channel_count: usize,
    store: SharedBufferStore,
    recorder: SharedRecorder,
    control: Arc<SessionControl>,
    stats: Arc<SessionStats>,
    events: Sender<SessionEvent>,
}

impl ReadLoop {
    /// Create a read loop over an open device
    pub fn new(
        device: Box<dyn SerialDevice>,
        store: SharedBufferStore,
        recorder: SharedRecorder,
        control: Arc<SessionControl>,
        stats: Arc<SessionStats>,
        events: Sender<SessionEvent>,
    ) -> Self {
        let channel_count = store.channel_count();
        Self {
            device,
            channel_count,
            store,
            recorder,
            control,
            stats,
            events,
        }
    }

    /// Run until a stop is requested or the device fails
    pub fn run(mut self) {
        let address = self.device.address().to_string();
        tracing::info!("Read loop started for {}", address);

        while !self.control.stop_requested() {
            match self.device.read_line() {
                Ok(ReadOutcome::Timeout) => SessionStats::bump(&self.stats.timeouts),
                Ok(ReadOutcome::Line(bytes)) => {
                    self.handle_line(&bytes);
                    SessionStats::bump(&self.stats.lines_read);
                }
                Err(e) => {
                    if self.control.stop_requested() {
                        tracing::debug!("Read error during shutdown ignored: {}", e);
                    } else {
                        self.fail(&address, e.to_string());
                    }
                    break;
                }
            }
        }

        self.device.close();
        self.send(SessionEvent::Disconnected { address: address.clone() });
        tracing::info!("Read loop stopped for {}", address);
    }

    fn handle_line(&self, bytes: &[u8]) {
        let row = match parse_line_bytes(bytes, self.channel_count) {
            Ok(row) => row,
            Err(LineError::Empty) => return,
            Err(e) => {
                SessionStats::bump(&self.stats.lines_rejected);
                tracing::trace!("Discarded line {:?}: {}", String::from_utf8_lossy(bytes), e);
                return;
            }
        };

        if self.control.is_paused() {
            SessionStats::bump(&self.stats.rows_dropped_paused);
            return;
        }

        // Recorded before it becomes visible in the store
        let mut recorder = lock_recorder(&self.recorder);
        let recorded = if recorder.is_recording() {
            Some(recorder.write(&row))
        } else {
            None
        };
        drop(recorder);
        match recorded {
            Some(Ok(())) => SessionStats::bump(&self.stats.rows_recorded),
            Some(Err(e)) => self.send(SessionEvent::RecordingError(e.to_string())),
            None => {}
        }

        self.store.append(row.values());
        SessionStats::bump(&self.stats.rows_accepted);
    }

    fn fail(&self, address: &str, reason: String) {
        self.control.mark_failed();
        tracing::error!("Device {} failed: {}", address, reason);

        match lock_recorder(&self.recorder).stop() {
            Ok(Some(summary)) => tracing::info!(
                "Recording {:?} closed after device failure ({} rows)",
                summary.path,
                summary.rows_written
            ),
            Ok(None) => {}
            Err(e) => self.send(SessionEvent::RecordingError(e.to_string())),
        }

        self.send(SessionEvent::DeviceError(reason));
    }

    fn send(&self, event: SessionEvent) {
        send_event(&self.events, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SerialVisError};
    use crate::session::Recorder;
    use crate::store::ChannelBufferStore;
    use std::collections::VecDeque;

    /// Device that replays a fixed script, then fails
    struct ScriptDevice {
        script: VecDeque<Result<ReadOutcome>>,
        open: bool,
    }

    impl ScriptDevice {
        fn new(lines: &[&str]) -> Self {
            let script = lines
                .iter()
                .map(|l| Ok(ReadOutcome::Line(format!("{}\n", l).into_bytes())))
                .collect();
            Self { script, open: true }
        }
    }

    impl SerialDevice for ScriptDevice {
        fn address(&self) -> &str {
            "script"
        }

        fn read_line(&mut self) -> Result<ReadOutcome> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(SerialVisError::DeviceIo("end of script".into())))
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn run_script(
        lines: &[&str],
        paused: bool,
    ) -> (SharedBufferStore, SessionStatsSnapshot, Vec<SessionEvent>) {
        let store = ChannelBufferStore::shared(vec!["A6".into(), "A7".into()], 10);
        let control = Arc::new(SessionControl::default());
        control.set_paused(paused);
        let stats = Arc::new(SessionStats::default());
        let (tx, rx) = crossbeam_channel::bounded(16);

        ReadLoop::new(
            Box::new(ScriptDevice::new(lines)),
            Arc::clone(&store),
            Recorder::shared(),
            Arc::clone(&control),
            Arc::clone(&stats),
            tx,
        )
        .run();

        assert!(control.has_failed());
        (store, stats.snapshot(), rx.try_iter().collect())
    }

    #[test]
    fn test_loop_applies_only_full_rows() {
        let (store, stats, _) =
            run_script(&["1.0,2.0", "1.0,abc", "3.0", "", "1.1,2.1", "1,2,3"], false);

        let snap = store.snapshot();
        assert_eq!(snap.channels[0].values, vec![1.0, 1.1]);
        assert_eq!(snap.channels[1].values, vec![2.0, 2.1]);
        assert_eq!(stats.lines_read, 6);
        assert_eq!(stats.rows_accepted, 2);
        assert_eq!(stats.lines_rejected, 3);
    }

    #[test]
    fn test_loop_drops_rows_while_paused() {
        let (store, stats, _) = run_script(&["1.0,2.0", "1.1,2.1"], true);
        assert!(store.snapshot().is_empty());
        assert_eq!(stats.rows_dropped_paused, 2);
        assert_eq!(stats.rows_accepted, 0);
    }

    #[test]
    fn test_device_error_reported_once() {
        let (_, _, events) = run_script(&["1.0,2.0"], false);
        let errors = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::DeviceError(_)))
            .count();
        assert_eq!(errors, 1);
        assert!(matches!(events.last(), Some(SessionEvent::Disconnected { .. })));
    }

    #[test]
    fn test_stats_reject_rate() {
        let stats = SessionStatsSnapshot {
            lines_read: 4,
            lines_rejected: 1,
            ..Default::default()
        };
        assert_eq!(stats.reject_rate(), 25.0);
        assert_eq!(SessionStatsSnapshot::default().reject_rate(), 0.0);
    }
}
