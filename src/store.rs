//! # Binary Signal Store Module
//!
//! Reads and writes the flat binary sample format: a sequence of rows, each
//! row two little-endian 16-bit signed integers (channel adc1, channel adc2),
//! row-major, no header and no embedded shape or dtype metadata. Row count is
//! derived from file size alone.
//!
//! ## Key Components
//! - `BinaryStore`: read-only random access over an existing file
//! - `BinaryStoreWriter`: preallocated sequential/indexed row writes with
//!   explicit durable flushes
//!
//! One writer or one reader owns the file handle at a time; concurrent access
//! to the same path is not supported.

use crate::error::SignalError;
use crate::sample::Sample;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Two i16 channels per row.
pub const BYTES_PER_ROW: u64 = 4;

/// Read-only random access over a binary signal file.
#[derive(Debug)]
pub struct BinaryStore {
    file: File,
    path: PathBuf,
}

impl BinaryStore {
    /// Open an existing binary file. Fails if the path is missing or not a
    /// regular file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SignalError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SignalError::io(path, e))?;
        let meta = file.metadata().map_err(|e| SignalError::io(path, e))?;
        if !meta.is_file() {
            return Err(SignalError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total rows, re-derived from the current file length on every call so
    /// callers always see the latest size of a file that may still be growing.
    pub fn row_count(&self) -> Result<u64, SignalError> {
        let meta = self
            .file
            .metadata()
            .map_err(|e| SignalError::io(&self.path, e))?;
        Ok(meta.len() / BYTES_PER_ROW)
    }

    /// Read rows `[start_row, end_row)` widened to floating point.
    ///
    /// The range is clipped to the end of the file: rows at or past the file
    /// end are never read or fabricated here. Callers that need a fixed-length
    /// window pad the remainder with missing markers themselves.
    pub fn read_range(&mut self, start_row: u64, end_row: u64) -> Result<Vec<Sample>, SignalError> {
        let rows = self.row_count()?;
        let end_row = end_row.min(rows);
        if start_row >= end_row {
            return Ok(Vec::new());
        }

        let count = (end_row - start_row) as usize;
        let mut buf = vec![0u8; count * BYTES_PER_ROW as usize];
        self.file
            .seek(SeekFrom::Start(start_row * BYTES_PER_ROW))
            .map_err(|e| SignalError::io(&self.path, e))?;
        self.file
            .read_exact(&mut buf)
            .map_err(|e| SignalError::io(&self.path, e))?;

        let mut cursor = &buf[..];
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let adc1 = cursor
                .read_i16::<LittleEndian>()
                .map_err(|e| SignalError::io(&self.path, e))?;
            let adc2 = cursor
                .read_i16::<LittleEndian>()
                .map_err(|e| SignalError::io(&self.path, e))?;
            samples.push(Sample::from_raw(adc1, adc2));
        }
        Ok(samples)
    }
}

/// Writer over a preallocated binary signal file.
pub struct BinaryStoreWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    rows: u64,
    next_row: u64,
}

impl BinaryStoreWriter {
    /// Create or truncate `path`, sized for exactly `rows` rows.
    pub fn create(path: impl AsRef<Path>, rows: u64) -> Result<Self, SignalError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| SignalError::io(path, e))?;
        file.set_len(rows * BYTES_PER_ROW)
            .map_err(|e| SignalError::io(path, e))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            rows,
            next_row: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Write one row at `index`. Sequential writes never seek; out-of-order
    /// indices flush the buffer and reposition.
    pub fn write_row(&mut self, index: u64, adc1: i16, adc2: i16) -> Result<(), SignalError> {
        if index >= self.rows {
            return Err(SignalError::RowOutOfRange {
                index,
                rows: self.rows,
            });
        }
        if index != self.next_row {
            self.writer
                .seek(SeekFrom::Start(index * BYTES_PER_ROW))
                .map_err(|e| SignalError::io(&self.path, e))?;
        }
        self.writer
            .write_i16::<LittleEndian>(adc1)
            .map_err(|e| SignalError::io(&self.path, e))?;
        self.writer
            .write_i16::<LittleEndian>(adc2)
            .map_err(|e| SignalError::io(&self.path, e))?;
        self.next_row = index + 1;
        Ok(())
    }

    /// Force buffered rows to durable storage. Long writes call this at a
    /// fixed cadence so buffer growth stays bounded; it must run at least once
    /// before the writer is discarded.
    pub fn flush(&mut self) -> Result<(), SignalError> {
        self.writer
            .flush()
            .map_err(|e| SignalError::io(&self.path, e))?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(|e| SignalError::io(&self.path, e))?;
        Ok(())
    }

    /// Flush and release the file handle.
    pub fn close(mut self) -> Result<(), SignalError> {
        self.flush()
    }
}
