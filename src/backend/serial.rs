//! Serial port backend
//!
//! This module provides the device implementation for real hardware using
//! the `serialport` crate. Any USB-serial adapter or on-board CDC port the
//! operating system exposes can be used (`/dev/ttyUSB0`, `/dev/ttyACM0`,
//! `COM3`, ...).
//!
//! # Line Framing
//!
//! Reads are buffered and split on `\n`. A line that arrives in pieces across
//! several read timeouts is reassembled: partial bytes are kept until the
//! terminator shows up. No read ever grows a line past `MAX_LINE_LENGTH`;
//! a longer line is dropped up to and including its terminator.
//!
//! # Example
//!
//! ```ignore
//! use serialvis_rs::backend::{DeviceConnector, SerialPortConnector};
//!
//! let mut device = SerialPortConnector.open("COM3", 115200, Duration::from_millis(100))?;
//! let outcome = device.read_line()?;
//! ```

use crate::error::{Result, SerialVisError};
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::time::Duration;

use super::device::{DeviceConnector, ReadOutcome, SerialDevice};

/// Longest line kept while waiting for a terminator
const MAX_LINE_LENGTH: usize = 4096;

/// Opens real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortConnector;

impl DeviceConnector for SerialPortConnector {
    fn open(
        &self,
        address: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialDevice>> {
        let port = serialport::new(address, baud)
            .timeout(read_timeout)
            .open()
            .map_err(|e| SerialVisError::connect(address, e.to_string()))?;

        tracing::info!("Opened serial port {} at {} baud", address, baud);
        Ok(Box::new(SerialPortDevice {
            address: address.to_string(),
            reader: Some(BufReader::new(port)),
            framer: LineFramer::default(),
        }))
    }
}

/// An open serial port
pub struct SerialPortDevice {
    address: String,
    reader: Option<BufReader<Box<dyn serialport::SerialPort>>>,
    framer: LineFramer,
}

impl SerialDevice for SerialPortDevice {
    fn address(&self) -> &str {
        &self.address
    }

    fn read_line(&mut self) -> Result<ReadOutcome> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(SerialVisError::DeviceIo(format!(
                "Serial port {} is closed",
                self.address
            )));
        };

        match self.framer.next_line(reader) {
            Ok(Framed::Line(line)) => Ok(ReadOutcome::Line(line)),
            Ok(Framed::Overlong(dropped)) => {
                tracing::warn!(
                    "Dropping line from {} longer than {} bytes ({} bytes so far)",
                    self.address,
                    MAX_LINE_LENGTH,
                    dropped
                );
                Ok(ReadOutcome::Timeout)
            }
            Ok(Framed::Skipped) => Ok(ReadOutcome::Timeout),
            Ok(Framed::EndOfStream) => Err(SerialVisError::DeviceIo(format!(
                "Serial port {} reached end of stream",
                self.address
            ))),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) => Err(SerialVisError::DeviceIo(format!(
                "Read from {} failed: {}",
                self.address, e
            ))),
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            self.framer = LineFramer::default();
            tracing::info!("Closed serial port {}", self.address);
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl Drop for SerialPortDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// What one framing step produced
#[derive(Debug, PartialEq, Eq)]
enum Framed {
    /// A complete line, or the unterminated tail of the stream
    Line(Vec<u8>),
    /// A line hit the length limit and was dropped; its tail will be skipped
    Overlong(usize),
    /// Part of an overlong line was skipped
    Skipped,
    /// The reader returned no bytes
    EndOfStream,
}

/// Splits a byte stream into `\n`-terminated lines of bounded length
#[derive(Debug, Default)]
struct LineFramer {
    /// Bytes of a line whose terminator has not arrived yet
    pending: Vec<u8>,
    /// Set while skipping the rest of an overlong line
    discarding: bool,
}

impl LineFramer {
    /// Read at most up to the next terminator, never holding more than
    /// `MAX_LINE_LENGTH` bytes
    fn next_line<R: BufRead>(&mut self, reader: &mut R) -> io::Result<Framed> {
        let room = (MAX_LINE_LENGTH - self.pending.len()) as u64;

        // read_until keeps whatever it read in `pending` even when it errors out
        let read = reader.by_ref().take(room).read_until(b'\n', &mut self.pending)?;
        if read == 0 {
            return Ok(Framed::EndOfStream);
        }

        let terminated = self.pending.last() == Some(&b'\n');
        if self.discarding {
            self.pending.clear();
            self.discarding = !terminated;
            return Ok(Framed::Skipped);
        }
        if !terminated && self.pending.len() >= MAX_LINE_LENGTH {
            let dropped = self.pending.len();
            self.pending.clear();
            self.discarding = true;
            return Ok(Framed::Overlong(dropped));
        }

        Ok(Framed::Line(std::mem::take(&mut self.pending)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Reader that hands out fixed chunks and errors, like a port with a timeout
    struct ChunkedReader {
        chunks: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ChunkedReader {
        fn new(chunks: Vec<io::Result<&str>>) -> BufReader<Self> {
            let chunks = chunks
                .into_iter()
                .map(|c| c.map(|s| s.as_bytes().to_vec()))
                .collect();
            BufReader::new(Self { chunks })
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    fn timed_out() -> io::Error {
        io::Error::new(ErrorKind::TimedOut, "timed out")
    }

    #[test]
    fn test_line_split_across_timeouts_is_reassembled() {
        let mut reader = ChunkedReader::new(vec![
            Ok("1.0,2"),
            Err(timed_out()),
            Ok(".0\n3.0,"),
            Err(timed_out()),
            Ok("4.0\n"),
        ]);
        let mut framer = LineFramer::default();

        assert!(matches!(
            framer.next_line(&mut reader),
            Err(e) if e.kind() == ErrorKind::TimedOut
        ));
        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::Line(b"1.0,2.0\n".to_vec()));
        assert!(framer.next_line(&mut reader).is_err());
        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::Line(b"3.0,4.0\n".to_vec()));
        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::EndOfStream);
    }

    #[test]
    fn test_unterminated_stream_never_exceeds_limit() {
        let block = "7".repeat(1000);
        let mut chunks = Vec::new();
        for _ in 0..64 {
            chunks.push(Ok(block.as_str()));
            chunks.push(Err(timed_out()));
        }
        let mut reader = ChunkedReader::new(chunks);
        let mut framer = LineFramer::default();

        let mut overlong = 0;
        loop {
            match framer.next_line(&mut reader) {
                Ok(Framed::EndOfStream) => break,
                Ok(Framed::Overlong(dropped)) => {
                    assert_eq!(dropped, MAX_LINE_LENGTH);
                    overlong += 1;
                }
                Ok(Framed::Line(line)) => panic!("unexpected line of {} bytes", line.len()),
                Ok(Framed::Skipped) | Err(_) => {}
            }
            assert!(framer.pending.len() <= MAX_LINE_LENGTH);
        }
        assert_eq!(overlong, 1);
    }

    #[test]
    fn test_overlong_line_dropped_through_its_terminator() {
        let mut data = vec![b'9'; MAX_LINE_LENGTH * 2 + 10];
        data.extend_from_slice(b",1.0\n1.0,2.0\n");
        let mut reader = Cursor::new(data);
        let mut framer = LineFramer::default();

        assert_eq!(
            framer.next_line(&mut reader).unwrap(),
            Framed::Overlong(MAX_LINE_LENGTH)
        );
        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::Skipped);
        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::Skipped);
        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::Line(b"1.0,2.0\n".to_vec()));
        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::EndOfStream);
    }

    #[test]
    fn test_line_at_limit_is_kept() {
        let mut line = vec![b'5'; MAX_LINE_LENGTH - 1];
        line.push(b'\n');
        let mut reader = Cursor::new(line.clone());
        let mut framer = LineFramer::default();

        assert_eq!(framer.next_line(&mut reader).unwrap(), Framed::Line(line));
    }

    #[test]
    #[ignore = "Opening a serial port depends on host hardware"]
    fn test_open_nonexistent_port_fails() {
        let result = SerialPortConnector.open(
            "/dev/serialvis-does-not-exist",
            9600,
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(SerialVisError::Connect { .. })));
    }
}
