//! # Signal Converter Module
//!
//! Transcodes a CSV signal recording into the flat binary format in two
//! passes: a counting pass sizes the target exactly, then a writing pass
//! streams every row into the preallocated store.
//!
//! The counting pass exists because the binary layout carries no header; the
//! file must be preallocated to its final size before the first row lands.
//!
//! Progress is reported as integer percentages at a fixed row cadence rather
//! than per row, which would flood the notification channel. Cancellation is
//! polled at the same cadence; a conversion cancelled or failed during the
//! writing phase removes the partial target file, so a truncated artifact is
//! never left on disk.

use crate::config::Config;
use crate::error::SignalError;
use crate::reader::{csv_error, parse_raw_record};
use crate::store::BinaryStoreWriter;
use crate::worker::{CancelToken, ProgressSink};
use csv::StringRecord;
use std::fs;
use std::path::Path;

pub struct SignalConverter {
    progress_interval_rows: u64,
    flush_interval_rows: u64,
}

impl SignalConverter {
    pub fn new(config: &Config) -> Self {
        Self {
            progress_interval_rows: config.progress_interval_rows.max(1),
            flush_interval_rows: config.flush_interval_rows.max(1),
        }
    }

    /// Convert `source` (CSV) into `target` (binary).
    ///
    /// Returns `Ok(true)` only if both phases ran to completion. A cancelled
    /// conversion returns `Ok(false)`; malformed rows and I/O failures return
    /// the error. On every non-success path during the writing phase the
    /// partial target file is deleted.
    pub fn convert<P: ProgressSink>(
        &self,
        source: &Path,
        target: &Path,
        progress: &P,
        cancel: &CancelToken,
    ) -> Result<bool, SignalError> {
        progress.progress(0);

        let row_count = match self.count_rows(source, cancel)? {
            Some(count) => count,
            None => {
                // Cancelled while counting; no target file exists yet.
                log::info!("conversion of {} cancelled during counting", source.display());
                return Ok(false);
            }
        };
        log::debug!("{} holds {} data rows", source.display(), row_count);

        match self.write_rows(source, target, row_count, progress, cancel) {
            Ok(true) => {
                progress.progress(100);
                log::info!("converted {} to {}", source.display(), target.display());
                Ok(true)
            }
            Ok(false) => {
                log::info!("conversion of {} cancelled, removing partial target", source.display());
                remove_partial(target);
                Ok(false)
            }
            Err(e) => {
                remove_partial(target);
                Err(e)
            }
        }
    }

    /// First pass: count data rows so the binary target can be preallocated
    /// to exact size. Returns `None` when cancelled mid-count.
    fn count_rows(&self, source: &Path, cancel: &CancelToken) -> Result<Option<u64>, SignalError> {
        let mut reader = open_csv(source)?;
        let mut record = StringRecord::new();
        let mut count: u64 = 0;
        while reader.read_record(&mut record).map_err(|e| csv_error(source, e))? {
            count += 1;
            if count % self.progress_interval_rows == 0 && cancel.is_cancelled() {
                return Ok(None);
            }
        }
        Ok(Some(count))
    }

    /// Second pass: reopen the CSV from the top and write each row into the
    /// preallocated store. Returns `Ok(false)` when cancelled; the caller
    /// removes the partial file once the writer handle is dropped.
    fn write_rows<P: ProgressSink>(
        &self,
        source: &Path,
        target: &Path,
        row_count: u64,
        progress: &P,
        cancel: &CancelToken,
    ) -> Result<bool, SignalError> {
        let mut reader = open_csv(source)?;
        let mut writer = BinaryStoreWriter::create(target, row_count)?;
        let mut record = StringRecord::new();
        let mut index: u64 = 0;

        while reader.read_record(&mut record).map_err(|e| csv_error(source, e))? {
            let (adc1, adc2) = parse_raw_record(source, &record)?;
            writer.write_row(index, adc1, adc2)?;
            index += 1;

            if index % self.flush_interval_rows == 0 {
                writer.flush()?;
            }
            if index % self.progress_interval_rows == 0 {
                let percent = (index * 100 / row_count).min(100) as u8;
                progress.progress(percent);
                if cancel.is_cancelled() {
                    return Ok(false);
                }
            }
        }

        writer.close()?;
        Ok(true)
    }
}

fn open_csv(source: &Path) -> Result<csv::Reader<fs::File>, SignalError> {
    if !source.is_file() {
        return Err(SignalError::io(
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        ));
    }
    csv::Reader::from_path(source).map_err(|e| csv_error(source, e))
}

fn remove_partial(target: &Path) {
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::error!("failed to remove partial file {}: {}", target.display(), e),
    }
}
