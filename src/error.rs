//! # Error Types Module
//!
//! Centralized error handling for the sigscope crate.
//!
//! ## Error Types
//! - `SignalError`: file access, format and range failures in the signal
//!   store, reader, analyzer, pager and converter
//! - `ConfigError`: configuration file I/O and parsing errors
//!
//! Cancellation is not an error: cancelled operations report a boolean
//! non-success outcome instead.

use std::fmt;
use std::path::PathBuf;

/// Errors raised by the signal engine.
#[derive(Debug)]
pub enum SignalError {
    /// Missing, unreadable or unwritable file
    Io { path: PathBuf, source: std::io::Error },
    /// Malformed CSV field or unsupported file suffix
    Format {
        path: PathBuf,
        line: Option<u64>,
        detail: String,
    },
    /// Row write past the preallocated end of a binary file
    RowOutOfRange { index: u64, rows: u64 },
    /// Window request with a non-positive span
    InvalidRange { start: u64, end: u64 },
    /// The render surface hung up mid-delivery
    SurfaceClosed,
}

impl SignalError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SignalError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(path: impl Into<PathBuf>, line: Option<u64>, detail: impl Into<String>) -> Self {
        SignalError::Format {
            path: path.into(),
            line,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            SignalError::Format { path, line, detail } => match line {
                Some(line) => {
                    write!(f, "bad data in {} at line {}: {}", path.display(), line, detail)
                }
                None => write!(f, "bad data in {}: {}", path.display(), detail),
            },
            SignalError::RowOutOfRange { index, rows } => {
                write!(f, "row {} is out of range for a {}-row file", index, rows)
            }
            SignalError::InvalidRange { start, end } => {
                write!(f, "invalid window range [{}, {})", start, end)
            }
            SignalError::SurfaceClosed => {
                write!(f, "render surface closed before acknowledging delivery")
            }
        }
    }
}

impl std::error::Error for SignalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SignalError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read or write the config file
    Io(std::io::Error),
    /// Failed to parse the config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize the config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => {
                write!(f, "failed to access config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_error_display() {
        let err = SignalError::RowOutOfRange { index: 12, rows: 10 };
        assert!(err.to_string().contains("row 12"));

        let err = SignalError::format("/tmp/a.csv", Some(3), "not an integer");
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_io_error_chain() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SignalError::io("/tmp/missing.bin", io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_config_error_chain() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::Io(io_err);
        assert!(err.source().is_some());
    }
}
