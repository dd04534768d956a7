//! Serial acquisition: sensor lines in, labeled raw CSV rows out.
//!
//! The firmware prints one line per sample, `NUM_FEATURES` comma-separated
//! ADC readings. [`AcquisitionLogger::run`] reads those lines until it is
//! cancelled or the source closes, appending each valid one as
//! `label,f0..f17` and skipping anything malformed.

pub mod record;
pub mod source;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AcquisitionConfig;
use crate::dataset::RawSample;
use crate::error::{PipelineError, Result};

pub use record::{parse_record, RecordError};
pub use source::{LineEvent, LineSource, ReaderLineSource, SerialLineSource};

/// Counters reported when a run ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AcquisitionSummary {
    /// Rows written to the sink.
    pub accepted: u64,
    /// Non-empty lines rejected by [`parse_record`].
    pub skipped: u64,
}

/// Writes every valid line of a run under one class label.
#[derive(Clone, Debug)]
pub struct AcquisitionLogger {
    label: u8,
    target_samples: u64,
}

impl AcquisitionLogger {
    pub fn new(label: u8, target_samples: u64) -> Self {
        Self {
            label,
            target_samples,
        }
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(config.label, config.target_samples)
    }

    pub fn label(&self) -> u8 {
        self.label
    }

    /// Read from `source` until `cancel` is set or the source closes.
    ///
    /// Each accepted row reaches `sink` with a single `write_all` followed by
    /// a flush, so an interrupted run never leaves half a row behind. The
    /// flag is checked between reads; with a serial source the read timeout
    /// bounds how long cancellation takes to be noticed.
    ///
    /// # Errors
    /// Only I/O failures on the source or the sink end the run early.
    pub fn run<S, W>(&self, source: &mut S, sink: &mut W, cancel: &AtomicBool) -> Result<AcquisitionSummary>
    where
        S: LineSource + ?Sized,
        W: Write,
    {
        let mut summary = AcquisitionSummary::default();
        log::info!(
            "acquiring from {} with label {} (target {} samples)",
            source.name(),
            self.label,
            self.target_samples
        );

        loop {
            if cancel.load(Ordering::SeqCst) {
                log::info!("interrupt received, stopping acquisition");
                break;
            }

            let line = match source.read_line() {
                Ok(LineEvent::Line(line)) => line,
                Ok(LineEvent::Timeout) => continue,
                Ok(LineEvent::Closed) => {
                    log::info!("{} closed", source.name());
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PipelineError::io(source.name(), e)),
            };

            let features = match parse_record(&line) {
                Ok(features) => features,
                Err(RecordError::Empty) => continue,
                Err(e) => {
                    summary.skipped += 1;
                    log::warn!("skip line ({}): {}", e, line.trim());
                    continue;
                }
            };

            let row = encode_row(&RawSample::new(self.label, features))?;
            sink.write_all(&row)
                .and_then(|_| sink.flush())
                .map_err(|e| PipelineError::io("<acquisition output>", e))?;

            summary.accepted += 1;
            log::info!("[{}] Received: {:?}", summary.accepted, features);
            if summary.accepted == self.target_samples {
                log::info!(
                    "=== reached the target of {} samples ===",
                    self.target_samples
                );
            }
        }

        sink.flush()
            .map_err(|e| PipelineError::io("<acquisition output>", e))?;
        log::info!(
            "acquisition finished: {} samples written, {} lines skipped",
            summary.accepted,
            summary.skipped
        );
        Ok(summary)
    }
}

/// One complete CSV row, terminator included.
fn encode_row(sample: &RawSample) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::with_capacity(128));
    wtr.write_record(sample.to_record())?;
    wtr.into_inner()
        .map_err(|e| PipelineError::io("<row buffer>", e.into_error()))
}

/// Open the raw CSV for appending, creating it and its directory if needed.
pub fn open_output<P: AsRef<Path>>(path: P) -> Result<File> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipelineError::io(path, e))
}
