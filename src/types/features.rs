//! Window feature summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistical summary of a contiguous window of sensor readings.
///
/// Produced only from non-empty windows (see
/// [`extract`](crate::detection::features::extract)); all fields are
/// rounded to fixed precision so repeated extractions of the same
/// window are bit-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Timestamp of the first reading in the window
    pub window_start: DateTime<Utc>,
    /// Timestamp of the last reading in the window
    pub window_end: DateTime<Utc>,
    /// Arithmetic mean pressure (bar), 3 decimals
    pub avg_pressure: f64,
    /// Crude pressure slope `(first - last) / n` (bar per sample), 4 decimals.
    /// Zero for single-sample windows. Positive when pressure is falling.
    pub pressure_drop_rate: f64,
    /// Arithmetic mean flow rate (L/min), 2 decimals
    pub avg_flow: f64,
    /// Sample standard deviation of flow, 3 decimals. Zero when n <= 1.
    pub flow_std_dev: f64,
    /// Maximum acoustic amplitude in the window, 2 decimals
    pub acoustic_peak: f64,
    /// Number of readings summarized
    pub sample_count: usize,
}

impl FeatureVector {
    /// The 5-dimensional point fed to the anomaly model.
    ///
    /// Order matters: the isolation forest is trained and queried on the
    /// same fixed layout.
    pub fn as_point(&self) -> [f64; 5] {
        [
            self.avg_pressure,
            self.pressure_drop_rate,
            self.avg_flow,
            self.flow_std_dev,
            self.acoustic_peak,
        ]
    }
}
