//! Network topology model and pressure-gradient leak localization.
//!
//! The monitored network is a small directed-flow graph fixed at
//! construction from [`TopologyConfig`]. Localization is a threshold
//! heuristic, not a hydraulic solver: for every segment with pressures
//! at both endpoints, the measured drop is compared against that
//! segment's normal-drop threshold, and the segment with the greatest
//! positive deviation is the suspect. This trades modeling fidelity for
//! O(segments) evaluation and an explainable result.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::defaults::MAX_LOCALIZATION_CONFIDENCE;
use crate::config::{NodeConfig, TopologyConfig};
use crate::types::LocalizationResult;

/// Errors raised while constructing the network model.
///
/// A malformed topology fails here, at construction, never during
/// localization.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("segment {from}-{to} references unknown node {node}")]
    UnknownNode {
        from: String,
        to: String,
        node: String,
    },

    #[error("topology has no nodes")]
    Empty,
}

/// A monitored pipe run between two nodes, with its resolved threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub from: String,
    pub to: String,
    pub length_m: f64,
    /// Maximum pressure drop (bar) considered normal under expected
    /// flow direction (from -> to)
    pub drop_threshold: f64,
}

/// Immutable network model: nodes, segments, and per-segment thresholds.
#[derive(Debug)]
pub struct NetworkModel {
    nodes: Vec<NodeConfig>,
    /// Segments in config declaration order. This order is the
    /// documented tie-break for localization.
    segments: Vec<Segment>,
    default_threshold: f64,
}

impl NetworkModel {
    /// Build the model from topology config.
    ///
    /// Fails if any segment references a node that is not declared.
    pub fn from_config(
        topology: &TopologyConfig,
        default_threshold: f64,
    ) -> Result<Self, TopologyError> {
        if topology.nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let known: std::collections::HashSet<&str> =
            topology.nodes.iter().map(|n| n.id.as_str()).collect();

        let mut segments = Vec::with_capacity(topology.segments.len());
        for seg in &topology.segments {
            for node in [&seg.from, &seg.to] {
                if !known.contains(node.as_str()) {
                    return Err(TopologyError::UnknownNode {
                        from: seg.from.clone(),
                        to: seg.to.clone(),
                        node: node.clone(),
                    });
                }
            }
            segments.push(Segment {
                from: seg.from.clone(),
                to: seg.to.clone(),
                length_m: seg.length_m,
                drop_threshold: seg.drop_threshold.unwrap_or(default_threshold),
            });
        }

        Ok(Self {
            nodes: topology.nodes.clone(),
            segments,
            default_threshold,
        })
    }

    /// Node ids in declaration order.
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Segments in declaration order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve the normal-drop threshold for a node pair.
    ///
    /// Tolerates either orientation being supplied by the caller; falls
    /// back to the configured default when no segment matches.
    pub fn threshold_for(&self, u: &str, v: &str) -> f64 {
        self.segments
            .iter()
            .find(|s| (s.from == u && s.to == v) || (s.from == v && s.to == u))
            .map(|s| s.drop_threshold)
            .unwrap_or(self.default_threshold)
    }

    /// Attribute a detected anomaly to the most likely segment.
    ///
    /// For every segment with pressures supplied at both endpoints,
    /// `deviation = (pressure[from] - pressure[to]) - threshold`. The
    /// segment with the strictly greatest positive deviation wins; ties
    /// keep the first segment found in declaration order. Segments with
    /// a missing endpoint pressure are silently skipped.
    pub fn localize(&self, pressures: &HashMap<String, f64>) -> LocalizationResult {
        let mut max_deviation = 0.0;
        let mut suspect: Option<(&Segment, f64)> = None;

        for seg in &self.segments {
            let (pu, pv) = match (pressures.get(&seg.from), pressures.get(&seg.to)) {
                (Some(&pu), Some(&pv)) => (pu, pv),
                _ => continue,
            };
            let actual_drop = pu - pv;
            let deviation = actual_drop - seg.drop_threshold;
            if deviation > max_deviation {
                max_deviation = deviation;
                suspect = Some((seg, actual_drop));
            }
        }

        match suspect {
            Some((seg, actual_drop)) => {
                let confidence = (0.5 + max_deviation / 2.0).min(MAX_LOCALIZATION_CONFIDENCE);
                let confidence = (confidence * 100.0).round() / 100.0;
                LocalizationResult {
                    suspected_segment: Some((seg.from.clone(), seg.to.clone())),
                    confidence,
                    analysis: format!(
                        "Significant pressure drop of {:.2} bar detected between {} and {}.",
                        actual_drop, seg.from, seg.to
                    ),
                }
            }
            None => LocalizationResult {
                suspected_segment: None,
                confidence: 0.0,
                analysis: "Pressure gradients appear normal across all modeled segments."
                    .to_string(),
            },
        }
    }

    /// Derive per-node pressures from a network-average pressure using
    /// the configured per-node offsets. Used for automatic localization
    /// after a positive detection, where only the windowed average
    /// pressure is available.
    pub fn node_pressures_from(&self, avg_pressure: f64) -> HashMap<String, f64> {
        self.nodes
            .iter()
            .map(|n| (n.id.clone(), avg_pressure + n.pressure_offset))
            .collect()
    }

    /// The network as a GeoJSON FeatureCollection (nodes as Points,
    /// segments as LineStrings). Presentation only; coordinates play no
    /// part in localization.
    pub fn geo_json(&self) -> serde_json::Value {
        let mut features = Vec::with_capacity(self.nodes.len() + self.segments.len());

        for node in &self.nodes {
            features.push(serde_json::json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [node.lon, node.lat] },
                "properties": { "id": node.id, "type": "sensor" }
            }));
        }

        let coords: HashMap<&str, (f64, f64)> = self
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), (n.lon, n.lat)))
            .collect();
        for seg in &self.segments {
            let (Some(&from), Some(&to)) = (coords.get(seg.from.as_str()), coords.get(seg.to.as_str()))
            else {
                continue;
            };
            features.push(serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[from.0, from.1], [to.0, to.1]]
                },
                "properties": { "segment": format!("{}-{}", seg.from, seg.to) }
            }));
        }

        serde_json::json!({ "type": "FeatureCollection", "features": features })
    }
}
