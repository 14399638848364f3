//! # Window Pager Module
//!
//! Random access over a finite binary signal file: loads an absolute
//! `[start, end)` sample range and pages forward or backward by whole
//! windows, independent of any streaming cursor.
//!
//! Rows past the end of the file are padded with missing markers so a
//! requested window always keeps its length and the chart renders gaps
//! instead of crashing. The file's row count is re-derived from its size on
//! every read, so a file that is still being written pages correctly.
//!
//! CSV sources are not supported here; random access over a text format would
//! need an index the original format does not carry.

use crate::config::Config;
use crate::error::SignalError;
use crate::reader::SignalFormat;
use crate::render::RenderSurface;
use crate::sample::{decimate, Channel, RunningRange, MISSING};
use crate::store::BinaryStore;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct WindowPager {
    /// None when the suffix was unrecognized: every window is then delivered
    /// as all-missing rather than failing the viewer.
    store: Option<BinaryStore>,
    path: PathBuf,
    window_size: u64,
    display_stride: usize,
    sample_rate_hz: f64,
    channel: Channel,
    /// Left edge of the last loaded window.
    cursor: u64,
    range: RunningRange,
}

impl WindowPager {
    /// Open `path` for paging. A missing binary file is a hard failure, a
    /// `.csv` suffix is rejected outright, and any other suffix degrades to
    /// all-missing windows with a warning.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self, SignalError> {
        let path = path.as_ref().to_path_buf();
        let store = match SignalFormat::from_path(&path) {
            Some(SignalFormat::Binary) => Some(BinaryStore::open(&path)?),
            Some(SignalFormat::Csv) => {
                return Err(SignalError::format(
                    &path,
                    None,
                    "random access over CSV is not supported; convert to binary first",
                ));
            }
            None => {
                log::warn!(
                    "unsupported suffix on {}, windows will render as missing",
                    path.display()
                );
                None
            }
        };

        Ok(Self {
            store,
            path,
            window_size: config.window_size.max(1) as u64,
            display_stride: config.display_stride.max(1),
            sample_rate_hz: config.sample_rate_hz.max(1) as f64,
            channel: config.channel,
            cursor: 0,
            range: RunningRange::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Current file row count, refreshed from the file size on every call.
    pub fn row_count(&self) -> Result<u64, SignalError> {
        match &self.store {
            Some(store) => store.row_count(),
            None => Ok(0),
        }
    }

    /// Load rows `[start, end)` and deliver them to the surface.
    ///
    /// Rows at or past the file end become missing markers; they are never
    /// read from disk and never fabricated as zeros. The requested window
    /// length is always preserved.
    pub fn load_window(
        &mut self,
        start: u64,
        end: u64,
        surface: &mut impl RenderSurface,
    ) -> Result<(), SignalError> {
        if end <= start {
            return Err(SignalError::InvalidRange { start, end });
        }

        let mut ys = vec![MISSING; (end - start) as usize];
        if let Some(store) = &mut self.store {
            let real = store.read_range(start, end)?;
            for (slot, sample) in ys.iter_mut().zip(&real) {
                *slot = sample.channel(self.channel);
            }
        }

        self.range.widen(&ys);
        self.cursor = start;

        let xs: Vec<f64> = (start..end)
            .map(|offset| offset as f64 / self.sample_rate_hz)
            .collect();
        if self.range.is_bounded() {
            surface.set_axis_y(self.range.min, self.range.max)?;
        }
        surface.replace_series(
            &decimate(&xs, self.display_stride),
            &decimate(&ys, self.display_stride),
        )
    }

    /// Reload the window at the current cursor.
    pub fn current_window(&mut self, surface: &mut impl RenderSurface) -> Result<(), SignalError> {
        self.load_window(self.cursor, self.cursor + self.window_size, surface)
    }

    /// Step one window forward. Refuses to advance past the end of the file;
    /// returns whether a new window was loaded.
    pub fn next_window(&mut self, surface: &mut impl RenderSurface) -> Result<bool, SignalError> {
        let start = self.cursor + self.window_size;
        if start >= self.row_count()? {
            return Ok(false);
        }
        self.load_window(start, start + self.window_size, surface)?;
        Ok(true)
    }

    /// Step one window backward, clamping the cursor at the start of file.
    pub fn previous_window(&mut self, surface: &mut impl RenderSurface) -> Result<(), SignalError> {
        let start = self.cursor.saturating_sub(self.window_size);
        self.load_window(start, start + self.window_size, surface)
    }

    pub fn has_previous_window(&self) -> bool {
        self.cursor > 0
    }

    pub fn has_next_window(&self) -> Result<bool, SignalError> {
        Ok(self.cursor + self.window_size < self.row_count()?)
    }
}
