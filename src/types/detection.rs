//! Detection result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FeatureVector;

/// Severity category assigned by the deterministic severity classifier.
///
/// Independent of the anomaly model: severity is reported even when the
/// model is untrained or unconvinced, so operators can watch the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Minor => write!(f, "Minor"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Outcome of one detection evaluation.
///
/// Produced fresh on every evaluation, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Anomaly model verdict
    pub is_leak: bool,
    /// Normalized anomaly score in [0, 1] (1 = most anomalous)
    pub confidence: f64,
    /// Deterministic severity score in [0, 100]
    pub severity_score: f64,
    /// Severity category derived from the score
    pub severity: Severity,
    /// The feature vector this verdict was computed from
    pub features: FeatureVector,
    /// Wall-clock time of the evaluation
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display() {
        assert_eq!(format!("{}", Severity::Minor), "Minor");
        assert_eq!(format!("{}", Severity::Moderate), "Moderate");
        assert_eq!(format!("{}", Severity::Critical), "Critical");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Minor < Severity::Moderate);
        assert!(Severity::Moderate < Severity::Critical);
    }
}
