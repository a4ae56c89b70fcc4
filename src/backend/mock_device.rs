//! Mock Device Implementation for Testing
//!
//! This module provides mock serial devices that can be used for running
//! the application and its tests without real hardware.
//!
//! # Sources
//!
//! - **Feed**: lines are pushed from the test through a [`MockFeed`]; a read
//!   with nothing queued times out just like a quiet serial port. A queued
//!   [`MockStep::Fail`] makes the next read fail fatally.
//! - **Generator**: each channel follows a [`MockDataPattern`] and a line is
//!   produced at a fixed row rate, the way a microcontroller sketch would
//!   print readings.
//!
//! # Data Patterns
//!
//! - [`MockDataPattern::Constant`] - Fixed value
//! - [`MockDataPattern::Sine`] - Sinusoidal wave with configurable frequency/amplitude
//! - [`MockDataPattern::Counter`] - Incrementing counter with wrap-around
//! - [`MockDataPattern::Sawtooth`] - Linear ramp that resets periodically
//! - [`MockDataPattern::Square`] - Square wave alternating between two values
//! - [`MockDataPattern::Triangle`] - Triangle wave
//!
//! # Example
//!
//! ```ignore
//! use serialvis_rs::backend::mock_device::MockConnector;
//!
//! let (connector, feed) = MockConnector::scripted();
//! feed.send_row(&[1.0, 2.0]);
//! feed.send_line("1.0,abc");
//! feed.fail("cable unplugged");
//! ```
//!
//! # Enabling
//!
//! The mock device is available when the `mock-device` feature is enabled
//! (it is part of the default feature set).

use crate::error::{Result, SerialVisError};
use crate::session::types::format_row;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::device::{DeviceConnector, ReadOutcome, SerialDevice};

/// Pattern for generating mock data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockDataPattern {
    /// Constant value
    Constant(f64),
    /// Sine wave with frequency and amplitude
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Counter that increments once per row
    Counter { step: f64, min: f64, max: f64 },
    /// Sawtooth wave
    Sawtooth { period: f64, amplitude: f64 },
    /// Square wave
    Square { period: f64, amplitude: f64 },
    /// Triangle wave
    Triangle { period: f64, amplitude: f64 },
}

impl Default for MockDataPattern {
    fn default() -> Self {
        // Potentiometer-like voltage swinging across 0-5 V
        MockDataPattern::Sine {
            frequency: 0.5,
            amplitude: 2.5,
            offset: 2.5,
        }
    }
}

/// Per-channel generator state
#[derive(Debug, Clone)]
struct ChannelGenerator {
    pattern: MockDataPattern,
    counter_value: f64,
}

impl ChannelGenerator {
    fn new(pattern: MockDataPattern) -> Self {
        let counter_value = match pattern {
            MockDataPattern::Counter { min, step, .. } => min - step,
            _ => 0.0,
        };
        Self {
            pattern,
            counter_value,
        }
    }

    fn generate_value(&mut self, elapsed_secs: f64) -> f64 {
        match self.pattern {
            MockDataPattern::Constant(v) => v,
            MockDataPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * elapsed_secs).sin(),
            MockDataPattern::Counter { step, min, max } => {
                self.counter_value += step;
                if self.counter_value > max {
                    self.counter_value = min;
                } else if self.counter_value < min {
                    self.counter_value = max;
                }
                self.counter_value
            }
            MockDataPattern::Sawtooth { period, amplitude } => {
                let t = elapsed_secs % period;
                amplitude * (t / period)
            }
            MockDataPattern::Square { period, amplitude } => {
                let t = elapsed_secs % period;
                if t < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            MockDataPattern::Triangle { period, amplitude } => {
                let t = elapsed_secs % period;
                let half = period / 2.0;
                if t < half {
                    amplitude * (2.0 * t / half - 1.0)
                } else {
                    amplitude * (1.0 - 2.0 * (t - half) / half)
                }
            }
        }
    }
}

/// One scripted event for a fed mock device
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// A text line (a newline is appended)
    Line(String),
    /// Raw bytes delivered as one line
    Bytes(Vec<u8>),
    /// The next read fails with a device I/O error
    Fail(String),
}

/// Test-side handle for pushing data into fed mock devices
#[derive(Debug, Clone)]
pub struct MockFeed {
    tx: Sender<MockStep>,
}

impl MockFeed {
    /// Queue a text line
    pub fn send_line(&self, line: impl Into<String>) {
        let _ = self.tx.send(MockStep::Line(line.into()));
    }

    /// Queue a row formatted the way devices print it
    pub fn send_row(&self, values: &[f64]) {
        self.send_line(format_row(values));
    }

    /// Queue raw bytes
    pub fn send_bytes(&self, bytes: impl Into<Vec<u8>>) {
        let _ = self.tx.send(MockStep::Bytes(bytes.into()));
    }

    /// Queue a fatal read error
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.tx.send(MockStep::Fail(reason.into()));
    }
}

#[derive(Debug, Clone)]
enum MockSource {
    Feed(Receiver<MockStep>),
    Generator {
        patterns: Vec<MockDataPattern>,
        row_interval: Duration,
    },
}

#[derive(Debug, Default)]
struct MockCounters {
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Opens mock devices
#[derive(Debug, Clone)]
pub struct MockConnector {
    source: MockSource,
    open_error: Arc<Mutex<Option<String>>>,
    counters: Arc<MockCounters>,
}

impl MockConnector {
    /// Create a connector whose devices read from the returned feed
    pub fn scripted() -> (Self, MockFeed) {
        let (tx, rx) = unbounded();
        (Self::with_source(MockSource::Feed(rx)), MockFeed { tx })
    }

    /// Create a connector whose devices generate rows at `rate_hz`
    pub fn generator(patterns: Vec<MockDataPattern>, rate_hz: u32) -> Self {
        let rate_hz = rate_hz.max(1);
        Self::with_source(MockSource::Generator {
            patterns,
            row_interval: Duration::from_secs_f64(1.0 / rate_hz as f64),
        })
    }

    fn with_source(source: MockSource) -> Self {
        Self {
            source,
            open_error: Arc::new(Mutex::new(None)),
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// Make subsequent opens fail with `reason` (or succeed again with `None`)
    pub fn set_open_error(&self, reason: Option<&str>) {
        *self.open_error.lock().unwrap_or_else(PoisonError::into_inner) =
            reason.map(str::to_string);
    }

    /// Number of devices successfully opened
    pub fn open_count(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    /// Number of devices closed
    pub fn close_count(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }
}

impl DeviceConnector for MockConnector {
    fn open(
        &self,
        address: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialDevice>> {
        let open_error = self
            .open_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = open_error {
            return Err(SerialVisError::connect(address, reason));
        }

        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Mock device opened at {} ({} baud)", address, baud);

        let now = Instant::now();
        let source = match &self.source {
            MockSource::Feed(rx) => DeviceSource::Feed(rx.clone()),
            MockSource::Generator {
                patterns,
                row_interval,
            } => DeviceSource::Generator {
                channels: patterns.iter().copied().map(ChannelGenerator::new).collect(),
                row_interval: *row_interval,
                start: now,
                next_due: now,
            },
        };

        Ok(Box::new(MockDevice {
            address: address.to_string(),
            read_timeout,
            source,
            open: true,
            counters: Arc::clone(&self.counters),
        }))
    }
}

enum DeviceSource {
    Feed(Receiver<MockStep>),
    Generator {
        channels: Vec<ChannelGenerator>,
        row_interval: Duration,
        start: Instant,
        next_due: Instant,
    },
}

/// A mock device opened by [`MockConnector`]
pub struct MockDevice {
    address: String,
    read_timeout: Duration,
    source: DeviceSource,
    open: bool,
    counters: Arc<MockCounters>,
}

impl SerialDevice for MockDevice {
    fn address(&self) -> &str {
        &self.address
    }

    fn read_line(&mut self) -> Result<ReadOutcome> {
        if !self.open {
            return Err(SerialVisError::DeviceIo(format!(
                "Mock device {} is closed",
                self.address
            )));
        }

        match &mut self.source {
            DeviceSource::Feed(rx) => match rx.recv_timeout(self.read_timeout) {
                Ok(MockStep::Line(line)) => {
                    let mut bytes = line.into_bytes();
                    bytes.push(b'\n');
                    Ok(ReadOutcome::Line(bytes))
                }
                Ok(MockStep::Bytes(bytes)) => Ok(ReadOutcome::Line(bytes)),
                Ok(MockStep::Fail(reason)) => Err(SerialVisError::DeviceIo(reason)),
                Err(RecvTimeoutError::Timeout) => Ok(ReadOutcome::Timeout),
                Err(RecvTimeoutError::Disconnected) => Err(SerialVisError::DeviceIo(
                    "Mock feed disconnected".to_string(),
                )),
            },
            DeviceSource::Generator {
                channels,
                row_interval,
                start,
                next_due,
            } => {
                let now = Instant::now();
                if *next_due > now {
                    let wait = *next_due - now;
                    if wait > self.read_timeout {
                        std::thread::sleep(self.read_timeout);
                        return Ok(ReadOutcome::Timeout);
                    }
                    std::thread::sleep(wait);
                }
                *next_due += *row_interval;

                let elapsed = start.elapsed().as_secs_f64();
                let values: Vec<f64> = channels
                    .iter_mut()
                    .map(|c| c.generate_value(elapsed))
                    .collect();
                let mut bytes = format_row(&values).into_bytes();
                bytes.extend_from_slice(b"\r\n");
                Ok(ReadOutcome::Line(bytes))
            }
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            tracing::info!("Mock device {} closed", self.address);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.close();
    }
}
