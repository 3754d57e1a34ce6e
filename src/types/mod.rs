//! Shared data structures for the leak detection pipeline
//!
//! This module defines the core types flowing through the system:
//! - SensorReading: one timestamped pressure/flow/acoustic sample
//! - FeatureVector: statistical summary of a reading window
//! - DetectionResult: anomaly verdict + severity for one evaluation
//! - LocalizationResult: suspected network segment for a detected leak
//! - AppState: shared state for API handlers and the ingest loop

mod reading;
mod features;
mod detection;
mod localization;
mod state;

pub use reading::*;
pub use features::*;
pub use detection::*;
pub use localization::*;
pub use state::*;
