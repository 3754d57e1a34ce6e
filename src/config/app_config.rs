//! Service configuration - all calibration values as operator-tunable TOML
//!
//! Every constant that was previously hardcoded is a field in this module.
//! Each struct implements `Default` with values matching the reference
//! calibration, ensuring zero-change behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a deployment.
///
/// Load with `ServiceConfig::load()` which searches:
/// 1. `$AQUA_CONFIG` env var
/// 2. `./aqua_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Window buffer and anomaly model tuning
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Severity formula calibration
    #[serde(default)]
    pub severity: SeverityConfig,

    /// Localization heuristic tuning
    #[serde(default)]
    pub localization: LocalizationConfig,

    /// Monitored network topology
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Synthetic sensor source tuning
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Outbound notification channels
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// History persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            detection: DetectionConfig::default(),
            severity: SeverityConfig::default(),
            localization: LocalizationConfig::default(),
            topology: TopologyConfig::default(),
            simulation: SimulationConfig::default(),
            notifications: NotificationConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AQUA_CONFIG` environment variable
    /// 2. `./aqua_config.toml` in the current working directory
    /// 3. Built-in defaults (reference calibration)
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("AQUA_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded service config from AQUA_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from AQUA_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "AQUA_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("aqua_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded service config from ./aqua_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./aqua_config.toml, using defaults");
                }
            }
        }

        info!("No aqua_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// Topology node references are validated separately when the
    /// [`NetworkModel`](crate::localization::NetworkModel) is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.window_size == 0 {
            return Err(ConfigError::Validation(
                "detection.window_size must be at least 1".into(),
            ));
        }
        if self.detection.min_samples == 0 {
            return Err(ConfigError::Validation(
                "detection.min_samples must be at least 1".into(),
            ));
        }
        if self.detection.min_samples > self.detection.window_size {
            return Err(ConfigError::Validation(format!(
                "detection.min_samples ({}) exceeds window_size ({})",
                self.detection.min_samples, self.detection.window_size
            )));
        }
        if !(self.detection.contamination > 0.0 && self.detection.contamination <= 0.5) {
            return Err(ConfigError::Validation(
                "detection.contamination must be in (0, 0.5]".into(),
            ));
        }
        if self.detection.tree_count == 0 {
            return Err(ConfigError::Validation(
                "detection.tree_count must be at least 1".into(),
            ));
        }
        if self.severity.baseline_pressure <= 0.0 || self.severity.baseline_flow <= 0.0 {
            return Err(ConfigError::Validation(
                "severity baselines must be positive".into(),
            ));
        }
        if self.severity.max_acoustic <= 0.0 {
            return Err(ConfigError::Validation(
                "severity.max_acoustic must be positive".into(),
            ));
        }
        if self.severity.moderate_threshold >= self.severity.critical_threshold {
            return Err(ConfigError::Validation(format!(
                "severity.moderate_threshold ({}) must be below critical_threshold ({})",
                self.severity.moderate_threshold, self.severity.critical_threshold
            )));
        }
        let weight_sum = self.severity.pressure_weight
            + self.severity.flow_weight
            + self.severity.acoustic_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            warn!(
                weight_sum,
                "severity weights do not sum to 1.0; scores will not span the full 0-100 range"
            );
        }
        if self.localization.default_drop_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "localization.default_drop_threshold must be non-negative".into(),
            ));
        }

        // Duplicate node ids break threshold lookup and pressure mapping.
        let mut seen = std::collections::HashSet::new();
        for node in &self.topology.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate topology node id: {}",
                    node.id
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Detection
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Window buffer capacity (readings)
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Minimum buffered readings before evaluation produces a result
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Expected fraction of anomalous windows; sets the trained
    /// decision cut at the (1 - contamination) training-score quantile
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Number of isolation-forest trees
    #[serde(default = "default_tree_count")]
    pub tree_count: usize,
    /// RNG seed for reproducible forest training
    #[serde(default = "default_train_seed")]
    pub train_seed: u64,
}

fn default_window_size() -> usize {
    defaults::WINDOW_SIZE
}
fn default_min_samples() -> usize {
    defaults::MIN_SAMPLES
}
fn default_contamination() -> f64 {
    defaults::CONTAMINATION
}
fn default_tree_count() -> usize {
    defaults::FOREST_TREE_COUNT
}
fn default_train_seed() -> u64 {
    defaults::FOREST_TRAIN_SEED
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::WINDOW_SIZE,
            min_samples: defaults::MIN_SAMPLES,
            contamination: defaults::CONTAMINATION,
            tree_count: defaults::FOREST_TREE_COUNT,
            train_seed: defaults::FOREST_TRAIN_SEED,
        }
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Severity formula calibration.
///
/// The weights and baselines are calibration heuristics tuned against the
/// expected normal operating range, not physically derived constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// Expected normal line pressure (bar)
    #[serde(default = "default_baseline_pressure")]
    pub baseline_pressure: f64,
    /// Expected normal flow rate (L/min)
    #[serde(default = "default_baseline_flow")]
    pub baseline_flow: f64,
    /// Acoustic amplitude of a major burst (scales the acoustic term)
    #[serde(default = "default_max_acoustic")]
    pub max_acoustic: f64,
    /// Weight of the pressure-deficit term
    #[serde(default = "default_pressure_weight")]
    pub pressure_weight: f64,
    /// Weight of the flow-deviation term
    #[serde(default = "default_flow_weight")]
    pub flow_weight: f64,
    /// Weight of the acoustic-intensity term
    #[serde(default = "default_acoustic_weight")]
    pub acoustic_weight: f64,
    /// Scores at or above this are Moderate
    #[serde(default = "default_moderate_threshold")]
    pub moderate_threshold: f64,
    /// Scores at or above this are Critical
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
}

fn default_baseline_pressure() -> f64 {
    defaults::BASELINE_PRESSURE
}
fn default_baseline_flow() -> f64 {
    defaults::BASELINE_FLOW
}
fn default_max_acoustic() -> f64 {
    defaults::MAX_ACOUSTIC
}
fn default_pressure_weight() -> f64 {
    defaults::PRESSURE_WEIGHT
}
fn default_flow_weight() -> f64 {
    defaults::FLOW_WEIGHT
}
fn default_acoustic_weight() -> f64 {
    defaults::ACOUSTIC_WEIGHT
}
fn default_moderate_threshold() -> f64 {
    defaults::MODERATE_THRESHOLD
}
fn default_critical_threshold() -> f64 {
    defaults::CRITICAL_THRESHOLD
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            baseline_pressure: defaults::BASELINE_PRESSURE,
            baseline_flow: defaults::BASELINE_FLOW,
            max_acoustic: defaults::MAX_ACOUSTIC,
            pressure_weight: defaults::PRESSURE_WEIGHT,
            flow_weight: defaults::FLOW_WEIGHT,
            acoustic_weight: defaults::ACOUSTIC_WEIGHT,
            moderate_threshold: defaults::MODERATE_THRESHOLD,
            critical_threshold: defaults::CRITICAL_THRESHOLD,
        }
    }
}

// ============================================================================
// Localization
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationConfig {
    /// Fallback drop threshold (bar) for segments without an explicit one
    #[serde(default = "default_drop_threshold")]
    pub default_drop_threshold: f64,
}

fn default_drop_threshold() -> f64 {
    defaults::DEFAULT_DROP_THRESHOLD
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            default_drop_threshold: defaults::DEFAULT_DROP_THRESHOLD,
        }
    }
}

// ============================================================================
// Topology
// ============================================================================

/// A monitored point in the distribution network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node id (e.g. "Tank", "A")
    pub id: String,
    /// Latitude for map display (presentation only)
    #[serde(default)]
    pub lat: f64,
    /// Longitude for map display (presentation only)
    #[serde(default)]
    pub lon: f64,
    /// Expected pressure offset (bar) relative to the network average,
    /// used to derive per-node pressures for automatic localization
    #[serde(default)]
    pub pressure_offset: f64,
}

/// A monitored pipe run between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Upstream node id (expected flow direction: from -> to)
    pub from: String,
    /// Downstream node id
    pub to: String,
    /// Segment length in metres
    #[serde(default)]
    pub length_m: f64,
    /// Maximum pressure drop (bar) considered normal for this segment.
    /// Falls back to `localization.default_drop_threshold` when absent.
    pub drop_threshold: Option<f64>,
}

/// The monitored network: a small directed-flow graph.
///
/// Fixed for the process lifetime once the [`NetworkModel`]
/// (crate::localization::NetworkModel) is constructed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub segments: Vec<SegmentConfig>,
}

impl Default for TopologyConfig {
    /// The reference 5-node demo network: Tank -> A -> {B, C}, C -> D.
    fn default() -> Self {
        let node = |id: &str, lat: f64, lon: f64, pressure_offset: f64| NodeConfig {
            id: id.to_string(),
            lat,
            lon,
            pressure_offset,
        };
        let segment = |from: &str, to: &str, length_m: f64, threshold: f64| SegmentConfig {
            from: from.to_string(),
            to: to.to_string(),
            length_m,
            drop_threshold: Some(threshold),
        };
        Self {
            nodes: vec![
                node("Tank", 18.5204, 73.8567, 0.5),
                node("A", 18.5225, 73.8585, 0.0),
                node("B", 18.5240, 73.8560, -0.4),
                node("C", 18.5210, 73.8610, -0.4),
                node("D", 18.5195, 73.8635, -0.7),
            ],
            segments: vec![
                segment("Tank", "A", 100.0, 0.5),
                segment("A", "B", 50.0, 0.3),
                segment("A", "C", 80.0, 0.3),
                segment("C", "D", 40.0, 0.2),
            ],
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Base pressure (bar) in normal operation
    #[serde(default = "default_sim_pressure")]
    pub base_pressure: f64,
    /// Base flow rate (L/min) in normal operation
    #[serde(default = "default_sim_flow")]
    pub base_flow: f64,
    /// Base acoustic amplitude in normal operation
    #[serde(default = "default_sim_acoustic")]
    pub base_acoustic: f64,
    /// Seconds between ingestion ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

fn default_sim_pressure() -> f64 {
    defaults::SIM_BASE_PRESSURE
}
fn default_sim_flow() -> f64 {
    defaults::SIM_BASE_FLOW
}
fn default_sim_acoustic() -> f64 {
    defaults::SIM_BASE_ACOUSTIC
}
fn default_tick_interval() -> u64 {
    defaults::TICK_INTERVAL_SECS
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_pressure: defaults::SIM_BASE_PRESSURE,
            base_flow: defaults::SIM_BASE_FLOW,
            base_acoustic: defaults::SIM_BASE_ACOUSTIC,
            tick_interval_secs: defaults::TICK_INTERVAL_SECS,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Master switch for outbound notifications
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Destination email for leak alerts
    #[serde(default = "default_alert_email")]
    pub alert_email: String,
    /// Destination phone number for SMS alerts
    #[serde(default = "default_alert_phone")]
    pub alert_phone: String,
}

fn default_true() -> bool {
    true
}
fn default_alert_email() -> String {
    "ops@aquasentinel.io".to_string()
}
fn default_alert_phone() -> String {
    "+1234567890".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_email: default_alert_email(),
            alert_phone: default_alert_phone(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Retention cap on persisted readings
    #[serde(default = "default_max_readings")]
    pub max_readings: usize,
    /// Retention cap on persisted alerts
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,
}

fn default_storage_path() -> String {
    "./data/aquasentinel.db".to_string()
}
fn default_max_readings() -> usize {
    defaults::MAX_STORED_READINGS
}
fn default_max_alerts() -> usize {
    defaults::MAX_STORED_ALERTS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_readings: defaults::MAX_STORED_READINGS,
            max_alerts: defaults::MAX_STORED_ALERTS,
        }
    }
}
