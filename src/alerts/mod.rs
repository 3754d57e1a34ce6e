//! In-process alert fan-out.
//!
//! A tokio broadcast channel carries [`AlertPayload`]s from the ingest
//! loop to every live subscriber (WebSocket sessions, tests). Lagging
//! subscribers drop the oldest messages rather than backpressuring the
//! detection path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{DetectionResult, LocalizationResult, Severity};

/// Buffered alerts per subscriber before lag kicks in.
const CHANNEL_CAPACITY: usize = 100;

/// One leak alert as pushed to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub severity_score: f64,
    pub confidence: f64,
    /// "Tank-A" style label, or "Unknown" when localization found
    /// nothing.
    pub location: String,
    pub analysis: String,
}

impl AlertPayload {
    pub fn from_results(detection: &DetectionResult, localization: &LocalizationResult) -> Self {
        Self {
            timestamp: detection.timestamp,
            severity: detection.severity,
            severity_score: detection.severity_score,
            confidence: detection.confidence,
            location: localization.location_label(),
            analysis: localization.analysis.clone(),
        }
    }
}

/// Cloneable handle onto the alert broadcast channel.
#[derive(Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<AlertPayload>,
}

impl AlertBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an alert. A zero receiver count is normal when no
    /// dashboard is connected.
    pub fn publish(&self, alert: AlertPayload) {
        let _ = self.tx.send(alert);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertPayload> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}
