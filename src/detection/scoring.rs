//! Deterministic severity classification.
//!
//! Rule-based severity scoring, independent of the anomaly model: the
//! score is reported on every evaluation so operators can watch the
//! severity trend even while the model is untrained or unconvinced.
//!
//! Formula: three sub-scores, each clamped to [0, 100] before weighting:
//! - pressure deficit vs baseline (weight 0.5)
//! - flow standard deviation vs baseline flow (weight 0.3)
//! - acoustic peak vs major-burst amplitude (weight 0.2)
//!
//! The weights and baselines are calibration heuristics carried in
//! config; they are not physically derived.

use crate::config::SeverityConfig;
use crate::types::{FeatureVector, Severity};

/// Pure severity classifier configured with calibration baselines.
pub struct SeverityScorer {
    cfg: SeverityConfig,
}

impl SeverityScorer {
    pub fn new(cfg: SeverityConfig) -> Self {
        Self { cfg }
    }

    /// Compute the severity score in [0, 100] (2 decimals) and its category.
    pub fn score(&self, features: &FeatureVector) -> (f64, Severity) {
        let cfg = &self.cfg;

        // Pressure deficit as a percentage of baseline. Pressures above
        // baseline contribute nothing.
        let pressure_pct = ((cfg.baseline_pressure - features.avg_pressure)
            / cfg.baseline_pressure)
            .max(0.0)
            * 100.0;
        let pressure_pct = pressure_pct.min(100.0);

        // Flow instability as a percentage of baseline flow.
        let flow_pct = ((features.flow_std_dev / cfg.baseline_flow) * 100.0).min(100.0);

        // Acoustic peak scaled against the major-burst amplitude.
        let acoustic_pct = ((features.acoustic_peak / cfg.max_acoustic) * 100.0).min(100.0);

        let raw = pressure_pct * cfg.pressure_weight
            + flow_pct * cfg.flow_weight
            + acoustic_pct * cfg.acoustic_weight;
        let score = (raw.clamp(0.0, 100.0) * 100.0).round() / 100.0;

        (score, self.categorize(score))
    }

    /// Map a score to its category. Boundaries are inclusive on the
    /// upper side: 30.00 is Moderate, 60.00 is Critical.
    pub fn categorize(&self, score: f64) -> Severity {
        if score < self.cfg.moderate_threshold {
            Severity::Minor
        } else if score < self.cfg.critical_threshold {
            Severity::Moderate
        } else {
            Severity::Critical
        }
    }
}
