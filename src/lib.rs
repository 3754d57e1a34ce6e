//! AquaSentinel: Water Leak Detection and Localization
//!
//! Continuous monitoring service for water distribution networks.
//!
//! ## Architecture
//!
//! - **Detection Engine**: window buffer, statistical features, isolation
//!   forest anomaly scoring, deterministic severity classification
//! - **Network Model**: graph-based pressure-gradient leak localization
//! - **Ingest Pipeline**: tick-driven loop feeding the engine from a
//!   pluggable reading source
//! - **Simulator**: synthetic sensor generation for five operating
//!   scenarios
//! - **API**: axum dashboard endpoints with a WebSocket alert feed

pub mod alerts;
pub mod api;
pub mod config;
pub mod detection;
pub mod localization;
pub mod notifications;
pub mod pipeline;
pub mod simulation;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use types::{
    AppState, DetectionResult, FeatureVector, LocalizationRequest, LocalizationResult,
    SensorReading, Severity, SourceMode, SystemStatus,
};

// Re-export the core components
pub use alerts::{AlertBus, AlertPayload};
pub use api::{build_router, DashboardState};
pub use detection::{AnomalyScorer, DetectionEngine, SeverityScorer, WindowBuffer};
pub use localization::{NetworkModel, TopologyError};
pub use simulation::SensorSimulator;
pub use storage::{AlertRecord, HistoryStore, StorageError};
