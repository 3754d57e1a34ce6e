//! Persistent history for readings and alerts.
//!
//! Sled-backed storage with two trees: `readings` (every ingested
//! sample) and `alerts` (positive detections with their localization).
//! Keys are millisecond timestamps as big-endian bytes so iteration is
//! chronological and recent-first queries are a reverse scan.
//!
//! Writes do not flush individually. Sled's background flushing bounds
//! loss on crash to the last few samples, which the ingest loop
//! regenerates within seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{DetectionResult, LocalizationResult, SensorReading};

const READINGS_TREE: &str = "readings";
const ALERTS_TREE: &str = "alerts";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A persisted alert: the detection that fired plus its localization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub detection: DetectionResult,
    pub localization: LocalizationResult,
}

/// History store shared across the ingest loop and API handlers.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<sled::Db>,
    readings: sled::Tree,
    alerts: sled::Tree,
    max_readings: usize,
    max_alerts: usize,
}

impl HistoryStore {
    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(
        path: P,
        max_readings: usize,
        max_alerts: usize,
    ) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let readings = db.open_tree(READINGS_TREE)?;
        let alerts = db.open_tree(ALERTS_TREE)?;
        Ok(Self {
            db: Arc::new(db),
            readings,
            alerts,
            max_readings,
            max_alerts,
        })
    }

    /// Persist a reading, evicting the oldest entries past the
    /// retention cap.
    pub fn store_reading(&self, reading: &SensorReading) -> Result<(), StorageError> {
        let key = ts_key(reading.timestamp);
        let value = serde_json::to_vec(reading)?;
        self.readings.insert(key, value)?;
        enforce_cap(&self.readings, self.max_readings)?;
        Ok(())
    }

    /// Persist an alert, evicting the oldest entries past the
    /// retention cap.
    pub fn store_alert(&self, alert: &AlertRecord) -> Result<(), StorageError> {
        let key = ts_key(alert.timestamp);
        let value = serde_json::to_vec(alert)?;
        self.alerts.insert(key, value)?;
        enforce_cap(&self.alerts, self.max_alerts)?;
        Ok(())
    }

    /// The most recent readings, newest first.
    pub fn recent_readings(&self, limit: usize) -> Vec<SensorReading> {
        recent(&self.readings, limit)
    }

    /// The most recent alerts, newest first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<AlertRecord> {
        recent(&self.alerts, limit)
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    pub fn size_on_disk(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }

    /// Flush pending writes (shutdown path).
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

fn ts_key(ts: DateTime<Utc>) -> [u8; 8] {
    // Pre-1970 timestamps would sort wrong here; sensor clocks never
    // produce them.
    (ts.timestamp_millis().max(0) as u64).to_be_bytes()
}

fn recent<T: for<'de> Deserialize<'de>>(tree: &sled::Tree, limit: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(limit);
    for item in tree.iter().rev() {
        if out.len() >= limit {
            break;
        }
        if let Ok((_key, value)) = item {
            if let Ok(record) = serde_json::from_slice::<T>(&value) {
                out.push(record);
            }
        }
    }
    out
}

fn enforce_cap(tree: &sled::Tree, cap: usize) -> Result<(), StorageError> {
    while tree.len() > cap {
        match tree.pop_min()? {
            Some(_) => {}
            None => break,
        }
    }
    Ok(())
}
