//! # Chunked Signal Reader Module
//!
//! Streams a signal file as a lazy, finite sequence of bounded chunks so
//! arbitrarily large recordings are never loaded whole.
//!
//! ## Sources
//! - CSV: header line skipped, two integer columns per row, parsed with the
//!   `csv` crate. A malformed field fails the whole read with a format error.
//! - Binary: fixed strides of `chunk_size` rows via `BinaryStore::read_range`;
//!   the final chunk carries the remainder.
//!
//! A missing or non-file path yields an empty sequence and sets a flag for the
//! caller to report. The background task driving the read must stay alive, so
//! that condition is a warning here, never a panic or a hard error.

use crate::error::SignalError;
use crate::sample::Sample;
use crate::store::BinaryStore;
use csv::StringRecord;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Recognized signal file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFormat {
    Csv,
    Binary,
}

impl SignalFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SignalFormat::Csv),
            "bin" => Some(SignalFormat::Binary),
            _ => None,
        }
    }
}

/// Bounded slice of a streamed file, the unit of incremental I/O.
pub type Chunk = Vec<Sample>;

enum Source {
    Csv(csv::Reader<File>),
    Binary { store: BinaryStore, offset: u64 },
}

/// Lazy, non-restartable chunk sequence over one signal file.
pub struct ChunkedReader {
    source: Option<Source>,
    pending_error: Option<SignalError>,
    path: PathBuf,
    chunk_size: usize,
    missing: bool,
}

impl ChunkedReader {
    /// Open `path` for chunked streaming. Never fails outright: a missing
    /// path produces an empty sequence with `source_missing()` set, while an
    /// unsupported suffix or unreadable file surfaces one error through the
    /// sequence itself.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let chunk_size = chunk_size.max(1);

        if !path.is_file() {
            log::warn!("signal source {} does not exist, nothing to stream", path.display());
            return Self {
                source: None,
                pending_error: None,
                path,
                chunk_size,
                missing: true,
            };
        }

        let (source, pending_error) = match SignalFormat::from_path(&path) {
            Some(SignalFormat::Csv) => match csv::Reader::from_path(&path) {
                Ok(reader) => (Some(Source::Csv(reader)), None),
                Err(e) => (None, Some(csv_error(&path, e))),
            },
            Some(SignalFormat::Binary) => match BinaryStore::open(&path) {
                Ok(store) => (Some(Source::Binary { store, offset: 0 }), None),
                Err(e) => (None, Some(e)),
            },
            None => (
                None,
                Some(SignalError::format(&path, None, "unsupported file suffix")),
            ),
        };

        Self {
            source,
            pending_error,
            path,
            chunk_size,
            missing: false,
        }
    }

    /// True when the path did not exist or was not a regular file. Callers
    /// surface this as a warning rather than a failure.
    pub fn source_missing(&self) -> bool {
        self.missing
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_csv_chunk(&mut self) -> Option<Result<Chunk, SignalError>> {
        // The source is taken out for the duration of the read and only put
        // back while it can still produce data, so an error or EOF fuses the
        // sequence.
        let mut reader = match self.source.take() {
            Some(Source::Csv(reader)) => reader,
            other => {
                self.source = other;
                return None;
            }
        };

        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut record = StringRecord::new();
        let mut exhausted = false;
        while chunk.len() < self.chunk_size {
            match reader.read_record(&mut record) {
                Ok(true) => match parse_record(&self.path, &record) {
                    Ok(sample) => chunk.push(sample),
                    Err(e) => return Some(Err(e)),
                },
                Ok(false) => {
                    exhausted = true;
                    break;
                }
                Err(e) => return Some(Err(csv_error(&self.path, e))),
            }
        }
        if !exhausted {
            self.source = Some(Source::Csv(reader));
        }

        // The final chunk may be short; a zero-length chunk is suppressed.
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }

    fn next_binary_chunk(&mut self) -> Option<Result<Chunk, SignalError>> {
        let (mut store, offset) = match self.source.take() {
            Some(Source::Binary { store, offset }) => (store, offset),
            other => {
                self.source = other;
                return None;
            }
        };

        match store.read_range(offset, offset + self.chunk_size as u64) {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => {
                self.source = Some(Source::Binary {
                    store,
                    offset: offset + chunk.len() as u64,
                });
                Some(Ok(chunk))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl Iterator for ChunkedReader {
    type Item = Result<Chunk, SignalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }
        match self.source {
            Some(Source::Csv(_)) => self.next_csv_chunk(),
            Some(Source::Binary { .. }) => self.next_binary_chunk(),
            None => None,
        }
    }
}

/// Parse one CSV record into its raw channel pair.
pub(crate) fn parse_raw_record(
    path: &Path,
    record: &StringRecord,
) -> Result<(i16, i16), SignalError> {
    let line = record.position().map(|p| p.line());
    let field = |idx: usize| -> Result<i16, SignalError> {
        let raw = record.get(idx).ok_or_else(|| {
            SignalError::format(path, line, format!("missing column {}", idx + 1))
        })?;
        raw.trim().parse::<i16>().map_err(|_| {
            SignalError::format(path, line, format!("field {:?} is not a 16-bit integer", raw))
        })
    };
    Ok((field(0)?, field(1)?))
}

fn parse_record(path: &Path, record: &StringRecord) -> Result<Sample, SignalError> {
    let (adc1, adc2) = parse_raw_record(path, record)?;
    Ok(Sample::from_raw(adc1, adc2))
}

pub(crate) fn csv_error(path: &Path, err: csv::Error) -> SignalError {
    let line = err.position().map(|p| p.line());
    SignalError::format(path, line, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_csv_chunk_boundaries() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "sig.csv", "adc1,adc2\n1,2\n3,4\n5,6\n");

        let chunks: Vec<Chunk> = ChunkedReader::open(&path, 2)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], vec![Sample::from_raw(1, 2), Sample::from_raw(3, 4)]);
        assert_eq!(chunks[1], vec![Sample::from_raw(5, 6)]);
    }

    #[test]
    fn test_csv_no_empty_final_chunk() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "sig.csv", "adc1,adc2\n1,2\n3,4\n5,6\n7,8\n");

        let chunks: Vec<Chunk> = ChunkedReader::open(&path, 2)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_chunk_concatenation_preserves_length() {
        let dir = tempdir().unwrap();
        let mut body = String::from("adc1,adc2\n");
        for row in 0..7 {
            body.push_str(&format!("{},{}\n", row, row));
        }
        let path = write_csv(&dir, "sig.csv", &body);

        let chunks: Vec<Chunk> = ChunkedReader::open(&path, 3)
            .collect::<Result<_, _>>()
            .unwrap();
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 7);
        // Only the last chunk may be short.
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == 3));
        assert_eq!(chunks.last().unwrap().len(), 1);
    }

    #[test]
    fn test_csv_malformed_field_fails_read() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "sig.csv", "adc1,adc2\n1,2\nx,4\n5,6\n");

        let mut reader = ChunkedReader::open(&path, 10);
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, SignalError::Format { line: Some(3), .. }));
        // The sequence is fused after a failure.
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_missing_path_soft_failure() {
        let dir = tempdir().unwrap();
        let mut reader = ChunkedReader::open(dir.path().join("gone.csv"), 4);
        assert!(reader.source_missing());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_unsupported_suffix_is_format_error() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "sig.wav", "not a signal file");

        let mut reader = ChunkedReader::open(&path, 4);
        assert!(!reader.source_missing());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, SignalError::Format { .. }));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_binary_chunk_remainder() {
        use crate::store::BinaryStoreWriter;

        let dir = tempdir().unwrap();
        let path = dir.path().join("sig.bin");
        let mut writer = BinaryStoreWriter::create(&path, 5).unwrap();
        for row in 0..5 {
            writer.write_row(row, row as i16, -(row as i16)).unwrap();
        }
        writer.close().unwrap();

        let chunks: Vec<Chunk> = ChunkedReader::open(&path, 2)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(chunks[2][0], Sample::from_raw(4, -4));
    }
}
