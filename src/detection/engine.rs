//! Detection orchestrator.
//!
//! Owns the window buffer, anomaly scorer, and severity classifier, and
//! ties them into a single "evaluate now" operation. The surrounding
//! ingest loop drives `ingest` at the tick cadence and calls `evaluate`
//! once the window is full; API callers may evaluate on demand at any
//! time.

use chrono::Utc;
use tracing::debug;

use super::features;
use super::{AnomalyScorer, SeverityScorer, WindowBuffer};
use crate::config::{DetectionConfig, SeverityConfig};
use crate::types::{DetectionResult, FeatureVector, SensorReading};

pub struct DetectionEngine {
    buffer: WindowBuffer,
    scorer: AnomalyScorer,
    severity: SeverityScorer,
    min_samples: usize,
}

impl DetectionEngine {
    pub fn new(detection: &DetectionConfig, severity: SeverityConfig) -> Self {
        Self {
            buffer: WindowBuffer::new(detection.window_size),
            scorer: AnomalyScorer::new(detection),
            severity: SeverityScorer::new(severity),
            min_samples: detection.min_samples,
        }
    }

    /// Append a reading to the window buffer.
    pub fn ingest(&self, reading: SensorReading) {
        self.buffer.push(reading);
    }

    /// Extract features from the current buffer contents.
    ///
    /// Returns `None` below the minimum sample count; insufficient data
    /// is an expected, recoverable condition, not a failure.
    pub fn current_features(&self) -> Option<FeatureVector> {
        let window = self.buffer.snapshot();
        if window.len() < self.min_samples {
            return None;
        }
        // The window is non-empty here, so extraction cannot fail.
        features::extract(&window).ok()
    }

    /// Run one detection evaluation against the current buffer.
    ///
    /// Returns `None` when fewer than `min_samples` readings are
    /// buffered. The anomaly scorer and severity classifier run
    /// independently: `is_leak`/`confidence` come from the model,
    /// severity is reported regardless of the verdict.
    pub fn evaluate(&self) -> Option<DetectionResult> {
        let features = self.current_features()?;

        let (is_leak, confidence) = self.scorer.predict(&features);
        let (severity_score, severity) = self.severity.score(&features);

        debug!(
            is_leak,
            confidence, severity_score, "Detection evaluation complete"
        );

        Some(DetectionResult {
            is_leak,
            confidence,
            severity_score,
            severity,
            features,
            timestamp: Utc::now(),
        })
    }

    /// Train (or retrain) the anomaly model on known-normal feature sets.
    pub fn train(&self, samples: &[FeatureVector]) {
        self.scorer.train(samples);
    }

    /// Whether the anomaly model has a trained snapshot loaded.
    pub fn is_trained(&self) -> bool {
        self.scorer.is_trained()
    }

    /// Current buffered reading count.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Window capacity.
    pub fn window_size(&self) -> usize {
        self.buffer.capacity()
    }

    /// Access the anomaly scorer (status endpoints).
    pub fn scorer(&self) -> &AnomalyScorer {
        &self.scorer
    }
}
