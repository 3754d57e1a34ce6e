//! The tick-driven ingest and detection loop.
//!
//! Every tick: draw a reading from the source, buffer it, persist it,
//! and, once the window is full, run a detection evaluation. A positive
//! detection triggers localization, alert persistence, broadcast
//! fan-out, and notifications. Collaborator failures (storage,
//! notifications) are logged and never stall ingestion.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::source::ReadingSource;
use crate::alerts::{AlertBus, AlertPayload};
use crate::detection::DetectionEngine;
use crate::localization::NetworkModel;
use crate::notifications::NotificationManager;
use crate::storage::{AlertRecord, HistoryStore};
use crate::types::{AppState, SystemStatus};

/// Counters reported when the loop exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub readings: u64,
    pub evaluations: u64,
    pub leaks: u64,
}

pub struct IngestLoop {
    engine: Arc<DetectionEngine>,
    network: Arc<NetworkModel>,
    app_state: Arc<RwLock<AppState>>,
    storage: HistoryStore,
    alerts: AlertBus,
    notifier: Arc<NotificationManager>,
    tick_interval: Duration,
    cancel_token: CancellationToken,
}

impl IngestLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Arc<DetectionEngine>,
        network: Arc<NetworkModel>,
        app_state: Arc<RwLock<AppState>>,
        storage: HistoryStore,
        alerts: AlertBus,
        notifier: Arc<NotificationManager>,
        tick_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            engine,
            network,
            app_state,
            storage,
            alerts,
            notifier,
            tick_interval,
            cancel_token,
        }
    }

    /// Run until cancelled. Returns final counters.
    pub async fn run<S: ReadingSource>(self, mut source: S) -> IngestStats {
        let mut stats = IngestStats::default();
        let mut ticker = tokio::time::interval(self.tick_interval);

        info!(
            source = source.source_name(),
            interval_ms = self.tick_interval.as_millis() as u64,
            "Ingest loop started"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Ingest loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick(&mut source, &mut stats).await;
                }
            }
        }

        if let Err(e) = self.storage.flush() {
            warn!(error = %e, "Failed to flush history store on shutdown");
        }

        info!(
            readings = stats.readings,
            evaluations = stats.evaluations,
            leaks = stats.leaks,
            "Ingest loop stopped"
        );
        stats
    }

    async fn tick<S: ReadingSource>(&self, source: &mut S, stats: &mut IngestStats) {
        let reading = source.next_reading().await;
        self.engine.ingest(reading.clone());
        stats.readings += 1;

        if let Err(e) = self.storage.store_reading(&reading) {
            warn!(error = %e, "Failed to persist reading");
        }

        let window_full = self.engine.buffered() >= self.engine.window_size();

        {
            let mut state = self.app_state.write().await;
            state.readings_ingested += 1;
            state.current_mode = reading.mode;
            state.last_reading = Some(reading);
            if !window_full && state.status != SystemStatus::Alert {
                state.status = SystemStatus::Buffering;
            }
        }

        // Evaluate only on a full window; partial windows would skew the
        // statistical features toward whatever arrived first.
        if !window_full {
            return;
        }

        let Some(detection) = self.engine.evaluate() else {
            return;
        };
        stats.evaluations += 1;

        if detection.is_leak {
            stats.leaks += 1;
            let pressures = self
                .network
                .node_pressures_from(detection.features.avg_pressure);
            let localization = self.network.localize(&pressures);

            info!(
                severity = %detection.severity,
                severity_score = detection.severity_score,
                confidence = detection.confidence,
                location = %localization.location_label(),
                "Leak detected"
            );

            let alert = AlertPayload::from_results(&detection, &localization);
            let record = AlertRecord {
                timestamp: detection.timestamp,
                detection: detection.clone(),
                localization: localization.clone(),
            };
            if let Err(e) = self.storage.store_alert(&record) {
                warn!(error = %e, "Failed to persist alert");
            }
            self.alerts.publish(alert.clone());
            self.notifier.send_leak_alert(&alert);

            let mut state = self.app_state.write().await;
            state.detections_run += 1;
            state.leaks_detected += 1;
            state.latest_detection = Some(detection);
            state.latest_localization = Some(localization);
            state.status = SystemStatus::Alert;
        } else {
            debug!(
                confidence = detection.confidence,
                severity_score = detection.severity_score,
                "Window evaluated, no leak"
            );
            let mut state = self.app_state.write().await;
            state.detections_run += 1;
            state.latest_detection = Some(detection);
            state.status = SystemStatus::Monitoring;
        }
    }
}
