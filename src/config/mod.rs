//! Service Configuration Module
//!
//! Provides deployment configuration loaded from TOML files, replacing all
//! hardcoded calibration values (severity baselines, weights, drop
//! thresholds, topology) with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `AQUA_CONFIG` environment variable (path to TOML file)
//! 2. `aqua_config.toml` in the current working directory
//! 3. Built-in defaults (matching the reference calibration)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(ServiceConfig::load());
//!
//! // Anywhere in the codebase:
//! let baseline = config::get().severity.baseline_pressure;
//! ```

mod app_config;
pub mod defaults;

pub use app_config::*;

use std::sync::OnceLock;

/// Global service configuration, initialized once at startup.
static SERVICE_CONFIG: OnceLock<ServiceConfig> = OnceLock::new();

/// Initialize the global service configuration.
///
/// Must be called exactly once before any calls to `get()`.
/// A second call is ignored with a warning.
pub fn init(config: ServiceConfig) {
    if SERVICE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global service configuration.
///
/// Panics if `init()` has not been called. A missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static ServiceConfig {
    #[allow(clippy::expect_used)]
    SERVICE_CONFIG
        .get()
        .expect("config::get() called before config::init(), which is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    SERVICE_CONFIG.get().is_some()
}
