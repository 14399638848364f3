//! Core sample types shared by the store, reader, analyzer and pager.

/// One row of a signal file: two ADC channel readings.
///
/// Stored on disk as two little-endian `i16` values, widened to `f64` for
/// processing. A value of `MISSING` (NaN) means "no data at this offset" and
/// is distinct from zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub adc1: f64,
    pub adc2: f64,
}

/// Placeholder for rows that do not exist in the source file.
pub const MISSING: f64 = f64::NAN;

impl Sample {
    pub fn from_raw(adc1: i16, adc2: i16) -> Self {
        Self {
            adc1: adc1 as f64,
            adc2: adc2 as f64,
        }
    }

    pub fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Adc1 => self.adc1,
            Channel::Adc2 => self.adc2,
        }
    }
}

/// Which ADC column is plotted as the window's y-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Channel {
    Adc1,
    Adc2,
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Adc1
    }
}

/// Widen-only y-range tracked across one analyzer or pager lifetime.
///
/// Starts at (+inf, -inf) so any first finite observation widens both bounds.
/// Missing markers never widen the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningRange {
    pub min: f64,
    pub max: f64,
}

impl RunningRange {
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// True once at least one finite value has been observed.
    pub fn is_bounded(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn widen(&mut self, values: &[f64]) {
        if let Some((lo, hi)) = values.min_max_finite() {
            self.min = self.min.min(lo);
            self.max = self.max.max(hi);
        }
    }
}

impl Default for RunningRange {
    fn default() -> Self {
        Self::new()
    }
}

pub trait ValueSliceExt {
    fn min_max_finite(&self) -> Option<(f64, f64)>;
}

impl ValueSliceExt for [f64] {
    fn min_max_finite(&self) -> Option<(f64, f64)> {
        self.iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((*v, *v)),
                Some((min, max)) => Some((min.min(*v), max.max(*v))),
            })
    }
}

/// Take every `stride`-th point for display.
///
/// Charts cannot render windows of hundreds of thousands of points per frame;
/// only the decimated arrays are handed to the render surface. The underlying
/// window is never altered.
pub fn decimate(values: &[f64], stride: usize) -> Vec<f64> {
    let stride = stride.max(1);
    values.iter().step_by(stride).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_ignores_missing() {
        let values = [MISSING, 3.0, -2.0, MISSING, 7.0];
        assert_eq!(values.min_max_finite(), Some((-2.0, 7.0)));
    }

    #[test]
    fn test_min_max_all_missing() {
        let values = [MISSING, MISSING];
        assert_eq!(values.min_max_finite(), None);
    }

    #[test]
    fn test_running_range_widens_monotonically() {
        let mut range = RunningRange::new();
        assert!(!range.is_bounded());

        range.widen(&[1.0, 2.0]);
        assert_eq!((range.min, range.max), (1.0, 2.0));

        // A narrower window must not shrink the range.
        range.widen(&[1.5]);
        assert_eq!((range.min, range.max), (1.0, 2.0));

        range.widen(&[-4.0, 9.0]);
        assert_eq!((range.min, range.max), (-4.0, 9.0));
    }

    #[test]
    fn test_decimate_stride() {
        let values: Vec<f64> = (0..10).map(|v| v as f64).collect();
        assert_eq!(decimate(&values, 3), vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(decimate(&values, 1).len(), 10);
        // Stride zero is clamped rather than panicking.
        assert_eq!(decimate(&values, 0).len(), 10);
    }

    #[test]
    fn test_sample_channel_select() {
        let sample = Sample::from_raw(-5, 12);
        assert_eq!(sample.channel(Channel::Adc1), -5.0);
        assert_eq!(sample.channel(Channel::Adc2), 12.0);
    }
}
