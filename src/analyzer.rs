//! # Signal Analyzer Module
//!
//! Streams a signal file through a fixed-length sliding window and hands
//! down-sampled views to the render surface. Intended to run on a worker
//! thread; the chart consumer lives on the UI thread behind the blocking
//! handoff in `render`.
//!
//! ## Main Loop
//! Each iteration pulls one chunk, shifts it into the trailing edge of the
//! window, advances the cursor by the chunk length, widens the running
//! y-range, then delivers the decimated window. The delivery blocks until the
//! renderer acknowledges, so analysis can never outrun drawing. When the file
//! is exhausted the pass restarts from the top, giving a continuous-replay
//! viewing mode, until cancellation is observed.
//!
//! Cancellation is polled between chunks and after each delivery; worst-case
//! stop latency is one chunk's worth of processing plus one render
//! acknowledgment.

use crate::config::Config;
use crate::error::SignalError;
use crate::reader::ChunkedReader;
use crate::render::RenderSurface;
use crate::sample::{decimate, Channel, RunningRange, Sample, MISSING};
use crate::worker::CancelToken;
use std::path::Path;

pub struct SignalAnalyzer {
    window_size: usize,
    chunk_size: usize,
    display_stride: usize,
    sample_rate_hz: f64,
    channel: Channel,
    /// Absolute sample offset of the window's left edge. Starts one window
    /// before the file so the first chunks scroll in over missing markers.
    cursor: i64,
    ys: Vec<f64>,
    range: RunningRange,
}

impl SignalAnalyzer {
    pub fn new(config: &Config) -> Self {
        let window_size = config.window_size.max(1);
        Self {
            window_size,
            chunk_size: config.chunk_size.max(1),
            display_stride: config.display_stride.max(1),
            sample_rate_hz: config.sample_rate_hz.max(1) as f64,
            channel: config.channel,
            cursor: -(window_size as i64),
            ys: vec![MISSING; window_size],
            range: RunningRange::new(),
        }
    }

    /// Stream `path` until cancelled.
    ///
    /// Soft failures (missing path, empty file) end the run with a logged
    /// warning and `Ok`. A renderer that hangs up ends the run the same way a
    /// stop request does. Malformed data is a real error and aborts the run.
    pub fn run(
        &mut self,
        path: &Path,
        surface: &mut impl RenderSurface,
        cancel: &CancelToken,
    ) -> Result<(), SignalError> {
        self.range = RunningRange::new();
        log::info!("starting signal analysis of {}", path.display());

        loop {
            self.cursor = -(self.window_size as i64);
            self.ys.clear();
            self.ys.resize(self.window_size, MISSING);

            let mut reader = ChunkedReader::open(path, self.chunk_size);
            let mut delivered = false;
            for chunk in reader.by_ref() {
                if cancel.is_cancelled() {
                    log::info!("signal analysis stopped");
                    return Ok(());
                }
                self.ingest(&chunk?);
                match self.deliver(surface) {
                    Ok(()) => delivered = true,
                    Err(SignalError::SurfaceClosed) => {
                        log::debug!("render surface closed, stopping analysis");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
                if cancel.is_cancelled() {
                    log::info!("signal analysis stopped");
                    return Ok(());
                }
            }

            if reader.source_missing() {
                log::warn!("nothing to analyze: {} is missing", path.display());
                return Ok(());
            }
            if !delivered {
                log::warn!("nothing to analyze: {} holds no samples", path.display());
                return Ok(());
            }
            // File exhausted: replay the window from the top of the file.
        }
    }

    /// Shift the chunk into the trailing edge of the window and advance the
    /// cursor. O(window) per chunk; chunks are much shorter than the window.
    fn ingest(&mut self, chunk: &[Sample]) {
        let keep = chunk.len().min(self.window_size);
        let window = self.window_size;
        self.ys.copy_within(keep.., 0);
        for (slot, sample) in self.ys[window - keep..]
            .iter_mut()
            .zip(&chunk[chunk.len() - keep..])
        {
            *slot = sample.channel(self.channel);
        }
        self.cursor += chunk.len() as i64;
        self.range.widen(&self.ys);
    }

    fn deliver(&self, surface: &mut impl RenderSurface) -> Result<(), SignalError> {
        let xs: Vec<f64> = (0..self.window_size)
            .map(|i| (self.cursor + i as i64) as f64 / self.sample_rate_hz)
            .collect();
        // The range is unbounded until the first finite sample arrives; an
        // infinite axis is never delivered.
        if self.range.is_bounded() {
            surface.set_axis_y(self.range.min, self.range.max)?;
        }
        surface.replace_series(
            &decimate(&xs, self.display_stride),
            &decimate(&self.ys, self.display_stride),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::RecordingSurface;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn test_config(window_size: usize, chunk_size: usize) -> Config {
        Config {
            window_size,
            chunk_size,
            display_stride: 1,
            sample_rate_hz: 1,
            ..Config::default()
        }
    }

    fn write_csv(dir: &tempfile::TempDir, rows: &[(i16, i16)]) -> PathBuf {
        let path = dir.path().join("sig.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "adc1,adc2").unwrap();
        for (adc1, adc2) in rows {
            writeln!(file, "{},{}", adc1, adc2).unwrap();
        }
        path
    }

    #[test]
    fn test_window_length_is_constant() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[(1, 0), (5, 0), (3, 0), (2, 0), (9, 0), (0, 0)]);

        let mut surface = RecordingSurface::with_limit(3);
        let mut analyzer = SignalAnalyzer::new(&test_config(8, 2));
        analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap();

        assert_eq!(surface.series.len(), 3);
        for (xs, ys) in &surface.series {
            assert_eq!(xs.len(), 8);
            assert_eq!(ys.len(), 8);
        }
    }

    #[test]
    fn test_cursor_advances_by_chunk_length() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[(1, 0), (5, 0), (3, 0), (2, 0), (9, 0), (0, 0)]);

        let mut surface = RecordingSurface::with_limit(3);
        let mut analyzer = SignalAnalyzer::new(&test_config(8, 2));
        analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap();

        // Window starts one window before the file; each delivery shifts the
        // left edge right by one chunk. Sample rate of 1 keeps x = offset.
        let left_edges: Vec<f64> = surface.series.iter().map(|(xs, _)| xs[0]).collect();
        assert_eq!(left_edges, vec![-6.0, -4.0, -2.0]);
    }

    #[test]
    fn test_window_contents_slide() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[(1, 0), (5, 0), (3, 0), (2, 0)]);

        let mut surface = RecordingSurface::with_limit(2);
        let mut analyzer = SignalAnalyzer::new(&test_config(4, 2));
        analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap();

        let (_, first) = &surface.series[0];
        assert!(first[0].is_nan() && first[1].is_nan());
        assert_eq!(&first[2..], &[1.0, 5.0]);

        let (_, second) = &surface.series[1];
        assert_eq!(second, &[1.0, 5.0, 3.0, 2.0]);
    }

    #[test]
    fn test_running_range_widens_across_deliveries() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[(1, 0), (5, 0), (3, 0), (2, 0), (9, 0), (0, 0)]);

        let mut surface = RecordingSurface::with_limit(3);
        let mut analyzer = SignalAnalyzer::new(&test_config(8, 2));
        analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap();

        assert_eq!(surface.axis, vec![(1.0, 5.0), (1.0, 5.0), (0.0, 9.0)]);
    }

    #[test]
    fn test_replay_restarts_window_but_keeps_range() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[(4, 0), (7, 0), (1, 0), (2, 0)]);

        // One full-window delivery per pass; the limit of 3 spans three
        // replay passes.
        let mut surface = RecordingSurface::with_limit(3);
        let mut analyzer = SignalAnalyzer::new(&test_config(4, 4));
        analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap();

        assert_eq!(surface.series.len(), 3);
        assert_eq!(surface.series[0], surface.series[1]);
        assert_eq!(surface.series[1], surface.series[2]);
        assert_eq!(surface.axis, vec![(1.0, 7.0); 3]);
    }

    #[test]
    fn test_missing_file_is_soft_failure() {
        let dir = tempdir().unwrap();
        let mut surface = RecordingSurface::new();
        let mut analyzer = SignalAnalyzer::new(&test_config(8, 2));

        let result = analyzer.run(
            &dir.path().join("gone.csv"),
            &mut surface,
            &CancelToken::new(),
        );
        assert!(result.is_ok());
        assert!(surface.series.is_empty());
    }

    #[test]
    fn test_empty_file_ends_run() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[]);

        let mut surface = RecordingSurface::new();
        let mut analyzer = SignalAnalyzer::new(&test_config(8, 2));
        analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap();
        assert!(surface.series.is_empty());
    }

    #[test]
    fn test_pre_cancelled_run_delivers_nothing() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[(1, 0), (2, 0)]);

        let cancel = CancelToken::new();
        cancel.cancel();

        let mut surface = RecordingSurface::new();
        let mut analyzer = SignalAnalyzer::new(&test_config(4, 2));
        analyzer.run(&path, &mut surface, &cancel).unwrap();
        assert!(surface.series.is_empty());
    }

    #[test]
    fn test_malformed_data_aborts_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sig.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "adc1,adc2\n1,2\nbroken,4").unwrap();

        let mut surface = RecordingSurface::new();
        let mut analyzer = SignalAnalyzer::new(&test_config(4, 2));
        let err = analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, SignalError::Format { .. }));
    }

    #[test]
    fn test_second_channel_selectable() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, &[(1, -10), (2, -20)]);

        let mut surface = RecordingSurface::with_limit(1);
        let mut config = test_config(2, 2);
        config.channel = Channel::Adc2;
        let mut analyzer = SignalAnalyzer::new(&config);
        analyzer
            .run(&path, &mut surface, &CancelToken::new())
            .unwrap();

        assert_eq!(surface.series[0].1, vec![-10.0, -20.0]);
    }
}
