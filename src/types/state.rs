//! Application state and system status
//!
//! Shared state for the leak detection service, accessible from API
//! handlers and the ingest loop. Wrapped in `Arc<RwLock<>>` for
//! thread-safe access across the async runtime.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{DetectionResult, LocalizationResult, SensorReading, SourceMode};

/// Shared application state accessible from API handlers and the ingest loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Current reading-source mode
    pub current_mode: SourceMode,

    /// System uptime (not serialized)
    #[serde(skip, default = "Instant::now")]
    pub uptime: Instant,

    /// Total readings ingested this session
    pub readings_ingested: u64,

    /// Total detection evaluations run
    pub detections_run: u64,

    /// Total positive leak detections
    pub leaks_detected: u64,

    /// Whether the anomaly model has been trained
    pub model_trained: bool,

    /// Most recent ingested reading
    pub last_reading: Option<SensorReading>,

    /// Most recent detection result
    pub latest_detection: Option<DetectionResult>,

    /// Most recent localization result (only set after a positive detection)
    pub latest_localization: Option<LocalizationResult>,

    /// Current system status
    pub status: SystemStatus,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            current_mode: SourceMode::Normal,
            uptime: Instant::now(),
            readings_ingested: 0,
            detections_run: 0,
            leaks_detected: 0,
            model_trained: false,
            last_reading: None,
            latest_detection: None,
            latest_localization: None,
            status: SystemStatus::Initializing,
        }
    }
}

impl AppState {
    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }
}

/// System operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemStatus {
    /// System is starting up
    Initializing,
    /// Buffer filling, no detections yet
    Buffering,
    /// Normal operation, monitoring active
    Monitoring,
    /// A leak detection is active
    Alert,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemStatus::Initializing => write!(f, "Initializing"),
            SystemStatus::Buffering => write!(f, "Buffering"),
            SystemStatus::Monitoring => write!(f, "Monitoring"),
            SystemStatus::Alert => write!(f, "Alert"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_default() {
        let state = AppState::default();
        assert_eq!(state.readings_ingested, 0);
        assert_eq!(state.leaks_detected, 0);
        assert!(!state.model_trained);
        assert_eq!(state.status, SystemStatus::Initializing);
    }

    #[test]
    fn test_system_status_display() {
        assert_eq!(format!("{}", SystemStatus::Initializing), "Initializing");
        assert_eq!(format!("{}", SystemStatus::Buffering), "Buffering");
        assert_eq!(format!("{}", SystemStatus::Monitoring), "Monitoring");
        assert_eq!(format!("{}", SystemStatus::Alert), "Alert");
    }
}
