//! HTTP API for the monitoring dashboard.
//!
//! Route tree:
//! - /health - service liveness and pipeline summary
//! - /api/v1/simulation/* - scenario control and sensor history
//! - /api/v1/detection/* - feature extraction, detection, training
//! - /api/v1/localization/* - network analysis and topology export
//! - /api/v1/alerts/* - alert history and the live WebSocket feed

pub mod handlers;
pub mod routes;

pub use routes::build_router;

use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::alerts::AlertBus;
use crate::detection::DetectionEngine;
use crate::localization::NetworkModel;
use crate::simulation::SensorSimulator;
use crate::storage::HistoryStore;
use crate::types::AppState;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct DashboardState {
    /// Application state from the pipeline
    pub app_state: Arc<RwLock<AppState>>,
    /// Detection engine (shared with the ingest loop)
    pub engine: Arc<DetectionEngine>,
    /// Network topology model
    pub network: Arc<NetworkModel>,
    /// Scenario simulator (shared with the ingest source)
    pub simulator: Arc<Mutex<SensorSimulator>>,
    /// Persistent history, absent in some test setups
    pub storage: Option<HistoryStore>,
    /// Alert fan-out channel
    pub alerts: AlertBus,
}
