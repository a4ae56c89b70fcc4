//! Recorder that mirrors live rows to a log file

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::error::{Result, SerialVisError};
use crate::types::SampleRow;

use super::types::{format_header, format_row, RecorderState, RecordingSummary};

/// Recorder shared between the coordinator and the read loop
pub type SharedRecorder = Arc<Mutex<Recorder>>;

/// Lock a shared recorder, recovering from poisoning
pub fn lock_recorder(recorder: &SharedRecorder) -> MutexGuard<'_, Recorder> {
    recorder.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open output file and its bookkeeping
#[derive(Debug)]
struct ActiveRecording {
    writer: BufWriter<File>,
    path: PathBuf,
    width: usize,
    rows_written: u64,
    started: Instant,
    started_at: chrono::DateTime<chrono::Local>,
}

/// Writes rows to a log file while active
#[derive(Debug, Default)]
pub struct Recorder {
    active: Option<ActiveRecording>,
}

impl Recorder {
    /// Create an idle recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle recorder behind a shared handle
    pub fn shared() -> SharedRecorder {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Get current state
    pub fn state(&self) -> RecorderState {
        if self.active.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Path of the active recording
    pub fn path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    /// Rows written to the active recording
    pub fn rows_written(&self) -> u64 {
        self.active.as_ref().map(|a| a.rows_written).unwrap_or(0)
    }

    /// Open `path`, write the header row and start recording
    pub fn start(&mut self, path: impl AsRef<Path>, header: &[String]) -> Result<()> {
        let path = path.as_ref();
        if let Some(active) = &self.active {
            return Err(SerialVisError::AlreadyRecording(active.path.clone()));
        }

        let file = File::create(path).map_err(|e| {
            SerialVisError::RecordingIo(format!("Failed to create {:?}: {}", path, e))
        })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", format_header(header))
            .and_then(|()| writer.flush())
            .map_err(|e| {
                SerialVisError::RecordingIo(format!(
                    "Failed to write header to {:?}: {}",
                    path, e
                ))
            })?;

        self.active = Some(ActiveRecording {
            writer,
            path: path.to_path_buf(),
            width: header.len(),
            rows_written: 0,
            started: Instant::now(),
            started_at: chrono::Local::now(),
        });
        tracing::info!("Recording started: {:?}", path);
        Ok(())
    }

    /// Append one row; no-op while idle
    ///
    /// A failed write ends the recording: the file is closed and the recorder
    /// returns to idle before the error is returned.
    pub fn write(&mut self, row: &SampleRow) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        if row.len() != active.width {
            tracing::warn!(
                "Skipping row of width {} for recording of width {}",
                row.len(),
                active.width
            );
            return Ok(());
        }

        // A row is on disk (or has failed) before the next one is read
        let written = writeln!(active.writer, "{}", format_row(row.values()))
            .and_then(|()| active.writer.flush());
        match written {
            Ok(()) => {
                active.rows_written += 1;
                Ok(())
            }
            Err(e) => {
                let path = active.path.clone();
                self.active = None;
                tracing::error!("Recording to {:?} aborted: {}", path, e);
                Err(SerialVisError::RecordingIo(format!(
                    "Failed to write to {:?}: {}",
                    path, e
                )))
            }
        }
    }

    /// Flush and close the output; returns `None` if not recording
    pub fn stop(&mut self) -> Result<Option<RecordingSummary>> {
        let Some(mut active) = self.active.take() else {
            return Ok(None);
        };

        let summary = RecordingSummary {
            path: active.path.clone(),
            rows_written: active.rows_written,
            started_at: active.started_at,
            duration: active.started.elapsed(),
        };

        active.writer.flush().map_err(|e| {
            SerialVisError::RecordingIo(format!("Failed to flush {:?}: {}", active.path, e))
        })?;

        tracing::info!(
            "Recording stopped: {:?} ({} rows)",
            summary.path,
            summary.rows_written
        );
        Ok(Some(summary))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("Failed to finalize recording on drop: {}", e);
        }
    }
}
