use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use serialport::SerialPort;

use crate::config::AcquisitionConfig;
use crate::error::Result;

/// Outcome of one blocking line read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line, terminator included when one was received.
    Line(String),
    /// The read timed out before a full line arrived.
    Timeout,
    /// The source is exhausted; no more lines will come.
    Closed,
}

/// Blocking, line-oriented input for the acquisition loop.
pub trait LineSource {
    fn read_line(&mut self) -> io::Result<LineEvent>;

    /// Short description for log and error messages.
    fn name(&self) -> &str;
}

/// Line source over any buffered reader.
///
/// Bytes of a line cut short by a timeout are kept and completed by the next
/// read. Invalid UTF-8 is dropped rather than replaced.
pub struct ReaderLineSource<R> {
    reader: R,
    name: String,
    pending: Vec<u8>,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            pending: Vec::new(),
        }
    }

    fn take_pending(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).replace(char::REPLACEMENT_CHARACTER, "")
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn read_line(&mut self) -> io::Result<LineEvent> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(LineEvent::Closed),
            Ok(_) => Ok(LineEvent::Line(self.take_pending())),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(LineEvent::Timeout)
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Serial port opened with a read timeout, read line by line.
pub struct SerialLineSource {
    inner: ReaderLineSource<BufReader<Box<dyn SerialPort>>>,
}

impl SerialLineSource {
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let handle = serialport::new(port, baud_rate).timeout(timeout).open()?;
        log::info!("opened {} @ {} bps", port, baud_rate);
        Ok(Self {
            inner: ReaderLineSource::new(BufReader::new(handle), port),
        })
    }

    pub fn from_config(config: &AcquisitionConfig) -> Result<Self> {
        Self::open(
            &config.port,
            config.baud_rate,
            Duration::from_millis(config.timeout_ms),
        )
    }
}

impl LineSource for SerialLineSource {
    fn read_line(&mut self) -> io::Result<LineEvent> {
        self.inner.read_line()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
