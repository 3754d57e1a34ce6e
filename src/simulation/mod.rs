//! Synthetic sensor generation for the five operating scenarios.
//!
//! The simulator is tick-driven: every call to [`SensorSimulator::next_reading`]
//! advances one tick, and time-dependent effects (gradual drops, burst
//! phases, oscillation) are keyed off the tick counter. Switching modes
//! resets the counter so each scenario starts from its beginning.

use chrono::Utc;
use rand::Rng;
use tracing::info;

use crate::config::SimulationConfig;
use crate::types::{SensorReading, SourceMode};

pub struct SensorSimulator {
    mode: SourceMode,
    pressure_base: f64,
    flow_base: f64,
    acoustic_base: f64,
    tick: u64,
}

impl SensorSimulator {
    pub fn new(cfg: &SimulationConfig) -> Self {
        Self {
            mode: SourceMode::Normal,
            pressure_base: cfg.base_pressure,
            flow_base: cfg.base_flow,
            acoustic_base: cfg.base_acoustic,
            tick: 0,
        }
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Switch scenario. Resets the tick counter so effects start from
    /// their initial phase.
    pub fn set_mode(&mut self, mode: SourceMode) {
        info!(from = %self.mode, to = %mode, "Simulation mode changed");
        self.mode = mode;
        self.tick = 0;
    }

    /// Produce the next reading for the active scenario.
    pub fn next_reading(&mut self) -> SensorReading {
        self.tick += 1;
        let t = self.tick as f64;
        let mut rng = rand::thread_rng();

        let noise_p = rng.gen_range(-0.05..=0.05);
        let noise_f = rng.gen_range(-1.0..=1.0);
        let noise_a = rng.gen_range(-0.5..=0.5);

        let (pressure, flow_rate, acoustic) = match self.mode {
            SourceMode::Normal => (
                self.pressure_base + noise_p,
                self.flow_base + noise_f,
                self.acoustic_base + noise_a,
            ),
            SourceMode::SmallLeak => {
                // Gradual pressure loss, 0.01 bar per tick capped at 2.0,
                // with flow climbing at the source
                let drop = (t * 0.01).min(2.0);
                (
                    self.pressure_base - drop + noise_p,
                    self.flow_base + t * 0.2 + noise_f,
                    self.acoustic_base + 5.0 + rng.gen_range(0.0..=2.0),
                )
            }
            SourceMode::MajorBurst => {
                if self.tick < 3 {
                    // Initial burst phase: flow spike, loud rupture
                    (
                        self.pressure_base - 3.0 + noise_p,
                        self.flow_base * 2.5 + noise_f,
                        self.acoustic_base + 50.0 + rng.gen_range(0.0..=10.0),
                    )
                } else {
                    // Sustained phase: collapsed pressure, starved flow
                    (
                        1.5 + noise_p,
                        self.flow_base * 0.2 + noise_f,
                        self.acoustic_base + 30.0 + rng.gen_range(0.0..=5.0),
                    )
                }
            }
            SourceMode::Intermittent => {
                // Leak opens and closes every 5 ticks
                if (self.tick / 5) % 2 == 0 {
                    (
                        self.pressure_base + noise_p,
                        self.flow_base + noise_f,
                        self.acoustic_base + noise_a,
                    )
                } else {
                    (
                        self.pressure_base - 1.5 + noise_p,
                        self.flow_base + 15.0 + noise_f,
                        self.acoustic_base + 12.0 + rng.gen_range(0.0..=3.0),
                    )
                }
            }
            SourceMode::ValveFault => (
                // Cyclic surges and drops from a hunting valve
                self.pressure_base + (t * 0.5).sin() * 2.5 + noise_p,
                self.flow_base + (t * 0.5).cos() * 20.0 + noise_f,
                self.acoustic_base + 8.0 + noise_a,
            ),
        };

        SensorReading {
            timestamp: Utc::now(),
            pressure: round_to(pressure.max(0.0), 3),
            flow_rate: round_to(flow_rate.max(0.0), 2),
            acoustic_signal: round_to(acoustic.max(0.0), 2),
            mode: self.mode,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
