//! Sensor reading types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operating mode of the reading source.
///
/// This is a provenance tag carried on every reading for audit purposes.
/// The detection pipeline itself never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Normal,
    SmallLeak,
    MajorBurst,
    Intermittent,
    ValveFault,
}

impl Default for SourceMode {
    fn default() -> Self {
        SourceMode::Normal
    }
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceMode::Normal => "normal",
            SourceMode::SmallLeak => "small_leak",
            SourceMode::MajorBurst => "major_burst",
            SourceMode::Intermittent => "intermittent",
            SourceMode::ValveFault => "valve_fault",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(SourceMode::Normal),
            "small_leak" => Ok(SourceMode::SmallLeak),
            "major_burst" => Ok(SourceMode::MajorBurst),
            "intermittent" => Ok(SourceMode::Intermittent),
            "valve_fault" => Ok(SourceMode::ValveFault),
            other => Err(format!("unknown source mode: {}", other)),
        }
    }
}

/// One pipeline sensor sample.
///
/// Immutable once produced. Units: pressure in bar, flow rate in L/min,
/// acoustic signal as relative amplitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    /// Line pressure (bar)
    pub pressure: f64,
    /// Volumetric flow rate (L/min)
    pub flow_rate: f64,
    /// Acoustic sensor amplitude (relative)
    pub acoustic_signal: f64,
    /// Provenance tag of the source that produced this reading
    #[serde(default)]
    pub mode: SourceMode,
}
