//! # Configuration Management Module
//!
//! Persistent application settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `sample_rate_hz`: sample-rate divisor of the signal source; x-coordinates
//!   are sample offsets divided by this value
//! - `window_size`: samples kept in the streaming/paging window
//! - `chunk_size`: samples read per streaming iteration
//! - `display_stride`: keep every Nth point when handing data to the chart
//! - `progress_interval_rows`: conversion rows between progress updates
//! - `flush_interval_rows`: conversion rows between durable flushes
//! - `channel`: which ADC column is plotted
//! - `last_open_dir`: directory the file-open dialog should start in
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/sigscope/config.toml
//! - Linux: ~/.config/sigscope/config.toml
//! - Windows: %APPDATA%\sigscope\config.toml

use crate::error::ConfigError;
use crate::sample::Channel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sample_rate_hz: u32,
    pub window_size: usize,
    pub chunk_size: usize,
    pub display_stride: usize,
    pub progress_interval_rows: u64,
    pub flush_interval_rows: u64,
    pub channel: Channel,
    /// Where the host UI's file-open dialog should start. Kept here so the
    /// "last opened directory" is explicit configuration, not process state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_open_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50_000,
            window_size: 500_000,
            chunk_size: 50_000,
            display_stride: 100,
            progress_interval_rows: 50_000,
            flush_interval_rows: 60 * 50_000,
            channel: Channel::Adc1,
            last_open_dir: None,
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sigscope")
            .join("config.toml")
    }

    /// Load config from file, or create default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let config = toml::from_str(&contents).map_err(ConfigError::ParseFailed)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File doesn't exist, create default
                let config = Self::default();
                config.save()?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(&path, toml_string).map_err(ConfigError::Io)?;

        Ok(())
    }
}
