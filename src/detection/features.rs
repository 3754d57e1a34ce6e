//! Statistical feature extraction from reading windows.
//!
//! Pure functions: the same window always yields a bit-identical
//! [`FeatureVector`]. Rounding to fixed precision is part of the contract
//! so downstream comparisons and stored results are reproducible.

use statrs::statistics::Statistics;
use thiserror::Error;

use crate::types::{FeatureVector, SensorReading};

/// Errors raised by feature extraction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
    /// Extraction was called on an empty window. This is a caller bug
    /// (the orchestrator gates on minimum sample count), not a runtime
    /// condition to default away.
    #[error("cannot extract features from an empty window")]
    EmptyWindow,
}

/// Round to a fixed number of decimal places.
fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Reduce an ordered window of readings to a [`FeatureVector`].
///
/// Fails with [`FeatureError::EmptyWindow`] on an empty slice. For a
/// single-sample window both `pressure_drop_rate` and `flow_std_dev`
/// are zero.
pub fn extract(window: &[SensorReading]) -> Result<FeatureVector, FeatureError> {
    let (first, last) = match (window.first(), window.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(FeatureError::EmptyWindow),
    };
    let n = window.len();

    let pressures: Vec<f64> = window.iter().map(|r| r.pressure).collect();
    let flows: Vec<f64> = window.iter().map(|r| r.flow_rate).collect();

    let avg_pressure = pressures.iter().mean();
    let avg_flow = flows.iter().mean();

    // Crude slope over the window: (start - end) / sample count. Positive
    // when pressure is falling. Not time-normalized beyond sample count.
    let (pressure_drop_rate, flow_std_dev) = if n > 1 {
        (
            (first.pressure - last.pressure) / n as f64,
            flows.iter().std_dev(),
        )
    } else {
        (0.0, 0.0)
    };

    let acoustic_peak = window
        .iter()
        .map(|r| r.acoustic_signal)
        .fold(f64::NEG_INFINITY, f64::max);

    Ok(FeatureVector {
        window_start: first.timestamp,
        window_end: last.timestamp,
        avg_pressure: round_to(avg_pressure, 3),
        pressure_drop_rate: round_to(pressure_drop_rate, 4),
        avg_flow: round_to(avg_flow, 2),
        flow_std_dev: round_to(flow_std_dev, 3),
        acoustic_peak: round_to(acoustic_peak, 2),
        sample_count: n,
    })
}
