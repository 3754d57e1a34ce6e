//! Localization request/result types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node pressure readings supplied by a caller for manual localization.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalizationRequest {
    /// node id -> pressure reading (bar)
    pub node_pressures: HashMap<String, f64>,
}

/// Outcome of a pressure-gradient localization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationResult {
    /// The (upstream, downstream) node pair of the suspected segment,
    /// or `None` when every segment is within its drop threshold.
    pub suspected_segment: Option<(String, String)>,
    /// Heuristic confidence in [0, 1], 0.0 when no segment is suspected
    pub confidence: f64,
    /// Human-readable analysis of the result
    pub analysis: String,
}

impl LocalizationResult {
    /// Segment label for alert payloads, e.g. "Tank-A" or "Unknown".
    pub fn location_label(&self) -> String {
        match &self.suspected_segment {
            Some((u, v)) => format!("{}-{}", u, v),
            None => "Unknown".to_string(),
        }
    }
}
