//! Reading sources for the ingest loop.
//!
//! [`ReadingSource`] abstracts where samples come from so the loop is
//! identical whether it is fed by the built-in simulator or, later, by
//! real field telemetry.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::simulation::SensorSimulator;
use crate::types::SensorReading;

#[async_trait]
pub trait ReadingSource: Send {
    /// Produce the next reading. Sources backed by real hardware may
    /// await I/O here; the simulator returns immediately.
    async fn next_reading(&mut self) -> SensorReading;

    /// Human-readable source name for logs.
    fn source_name(&self) -> &str;
}

/// Source backed by the shared scenario simulator.
///
/// The simulator sits behind a `Mutex` because API handlers switch its
/// mode concurrently with the ingest loop drawing readings. All
/// critical sections are short and never await.
pub struct SimulatorSource {
    simulator: Arc<Mutex<SensorSimulator>>,
}

impl SimulatorSource {
    pub fn new(simulator: Arc<Mutex<SensorSimulator>>) -> Self {
        Self { simulator }
    }
}

#[async_trait]
impl ReadingSource for SimulatorSource {
    async fn next_reading(&mut self) -> SensorReading {
        match self.simulator.lock() {
            Ok(mut sim) => sim.next_reading(),
            // A panic while holding the lock leaves the simulator state
            // intact; keep generating.
            Err(poisoned) => poisoned.into_inner().next_reading(),
        }
    }

    fn source_name(&self) -> &str {
        "simulator"
    }
}

/// Fixed-sequence source for tests: replays the given readings, then
/// repeats the last one.
#[cfg(test)]
pub struct ReplaySource {
    readings: Vec<SensorReading>,
    index: usize,
}

#[cfg(test)]
impl ReplaySource {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        Self { readings, index: 0 }
    }
}

#[cfg(test)]
#[async_trait]
impl ReadingSource for ReplaySource {
    async fn next_reading(&mut self) -> SensorReading {
        let i = self.index.min(self.readings.len() - 1);
        self.index += 1;
        self.readings[i].clone()
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}
