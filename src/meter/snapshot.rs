//! Level snapshots
//!
//! A snapshot is one arrival of per-channel levels: a bar value and a peak
//! marker for every channel, captured at the same moment.

use super::error::MeterError;

/// Immutable pair of same-length value and peak series
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    values: Vec<f32>,
    peaks: Vec<f32>,
}

impl Snapshot {
    /// Create a snapshot, checking that both series have one entry per channel
    pub fn new(values: Vec<f32>, peaks: Vec<f32>) -> Result<Self, MeterError> {
        if values.len() != peaks.len() {
            return Err(MeterError::InvariantViolation {
                values: values.len(),
                peaks: peaks.len(),
            });
        }
        Ok(Self { values, peaks })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build a snapshot from `(value, peak)` pairs, one per channel
impl FromIterator<(f32, f32)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (f32, f32)>>(iter: I) -> Self {
        let (values, peaks) = iter.into_iter().unzip();
        Self { values, peaks }
    }
}
