//! System-wide default constants.
//!
//! Centralises the calibration numbers and operational defaults used when no
//! config file overrides them. Grouped by subsystem for easy discovery.

// ============================================================================
// Detection
// ============================================================================

/// Window buffer capacity (readings).
///
/// 60 readings at 1 Hz = 1 minute of recent context.
pub const WINDOW_SIZE: usize = 60;

/// Minimum buffered readings before an evaluation produces a result.
pub const MIN_SAMPLES: usize = 5;

/// Expected fraction of anomalous windows in normal operation.
///
/// The forest's decision cut is calibrated at train time to the
/// (1 - contamination) quantile of training-sample scores, so roughly
/// this share of normal windows is flagged.
pub const CONTAMINATION: f64 = 0.05;

/// Number of trees in the isolation forest.
pub const FOREST_TREE_COUNT: usize = 100;

/// Per-tree subsample cap for isolation forest training.
pub const FOREST_SUBSAMPLE: usize = 256;

/// RNG seed for forest training (reproducible model builds).
pub const FOREST_TRAIN_SEED: u64 = 42;

// ============================================================================
// Severity calibration
// ============================================================================

/// Expected normal line pressure (bar).
pub const BASELINE_PRESSURE: f64 = 5.0;

/// Expected normal flow rate (L/min).
pub const BASELINE_FLOW: f64 = 100.0;

/// Acoustic amplitude of a major burst, used to scale the acoustic term.
pub const MAX_ACOUSTIC: f64 = 60.0;

/// Severity formula weights (pressure / flow / acoustic).
pub const PRESSURE_WEIGHT: f64 = 0.5;
pub const FLOW_WEIGHT: f64 = 0.3;
pub const ACOUSTIC_WEIGHT: f64 = 0.2;

/// Severity category boundaries: score < 30 Minor, < 60 Moderate, else Critical.
pub const MODERATE_THRESHOLD: f64 = 30.0;
pub const CRITICAL_THRESHOLD: f64 = 60.0;

// ============================================================================
// Localization
// ============================================================================

/// Fallback pressure-drop threshold (bar) for segments without an
/// explicit threshold in the topology config.
pub const DEFAULT_DROP_THRESHOLD: f64 = 0.5;

/// Confidence ceiling for localization results.
pub const MAX_LOCALIZATION_CONFIDENCE: f64 = 0.95;

// ============================================================================
// Ingestion
// ============================================================================

/// Seconds between ingestion ticks.
pub const TICK_INTERVAL_SECS: u64 = 1;

// ============================================================================
// Simulation
// ============================================================================

/// Simulator base pressure (bar).
pub const SIM_BASE_PRESSURE: f64 = 5.0;

/// Simulator base flow rate (L/min).
pub const SIM_BASE_FLOW: f64 = 100.0;

/// Simulator base acoustic amplitude.
pub const SIM_BASE_ACOUSTIC: f64 = 10.0;

// ============================================================================
// Storage
// ============================================================================

/// Maximum persisted sensor readings. 86 400 = 24 hours at 1 Hz.
pub const MAX_STORED_READINGS: usize = 86_400;

/// Maximum persisted leak alerts.
pub const MAX_STORED_ALERTS: usize = 1_000;
