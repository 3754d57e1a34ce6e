//! Request handling logic for all API endpoints.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::DashboardState;
use crate::detection::{features, ModelInfo};
use crate::simulation::SensorSimulator;
use crate::types::{
    DetectionResult, FeatureVector, LocalizationRequest, LocalizationResult, SensorReading,
    SourceMode,
};

// ============================================================================
// Shared Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

fn lock_simulator(state: &DashboardState) -> std::sync::MutexGuard<'_, SensorSimulator> {
    match state.simulator.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub current_mode: SourceMode,
    pub readings_ingested: u64,
    pub leaks_detected: u64,
    pub buffered_readings: usize,
    pub window_size: usize,
    pub model_trained: bool,
}

/// GET /health
pub async fn get_health(State(state): State<DashboardState>) -> Json<HealthResponse> {
    let app_state = state.app_state.read().await;
    Json(HealthResponse {
        status: app_state.status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: app_state.uptime_secs(),
        current_mode: app_state.current_mode,
        readings_ingested: app_state.readings_ingested,
        leaks_detected: app_state.leaks_detected,
        buffered_readings: state.engine.buffered(),
        window_size: state.engine.window_size(),
        model_trained: state.engine.is_trained(),
    })
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SimulationStatus {
    pub is_active: bool,
    pub current_mode: SourceMode,
    pub tick_count: u64,
    pub last_reading: Option<SensorReading>,
}

/// GET /api/v1/simulation/status
pub async fn get_simulation_status(State(state): State<DashboardState>) -> Json<SimulationStatus> {
    let (mode, tick) = {
        let sim = lock_simulator(&state);
        (sim.mode(), sim.tick_count())
    };
    let last_reading = state.app_state.read().await.last_reading.clone();
    Json(SimulationStatus {
        is_active: true,
        current_mode: mode,
        tick_count: tick,
        last_reading,
    })
}

#[derive(Debug, Serialize)]
pub struct ModeChangeResponse {
    pub message: String,
    pub mode: SourceMode,
}

/// POST /api/v1/simulation/mode/:mode
pub async fn set_simulation_mode(
    State(state): State<DashboardState>,
    Path(mode): Path<String>,
) -> Response {
    let mode = match SourceMode::from_str(&mode) {
        Ok(mode) => mode,
        Err(e) => return error(StatusCode::BAD_REQUEST, e),
    };

    lock_simulator(&state).set_mode(mode);
    state.app_state.write().await.current_mode = mode;

    Json(ModeChangeResponse {
        message: format!("Simulation mode set to {}", mode),
        mode,
    })
    .into_response()
}

/// GET /api/v1/simulation/data
///
/// Draws one reading from the simulator. The tick counter advances, so
/// polling this endpoint progresses scenario effects.
pub async fn get_simulation_data(State(state): State<DashboardState>) -> Json<SensorReading> {
    Json(lock_simulator(&state).next_reading())
}

/// GET /api/v1/simulation/history?limit=N
pub async fn get_sensor_history(
    State(state): State<DashboardState>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let Some(storage) = &state.storage else {
        return error(StatusCode::SERVICE_UNAVAILABLE, "history storage not available");
    };
    let limit = query.limit.unwrap_or(100);
    Json(storage.recent_readings(limit)).into_response()
}

// ============================================================================
// Detection
// ============================================================================

/// POST /api/v1/detection/extract
///
/// Extract features from a caller-supplied window of readings.
pub async fn extract_features(Json(window): Json<Vec<SensorReading>>) -> Response {
    match features::extract(&window) {
        Ok(features) => Json(features).into_response(),
        Err(e) => error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// GET /api/v1/detection/detect
///
/// Run a detection evaluation against the live buffer.
pub async fn run_detection(State(state): State<DashboardState>) -> Response {
    match state.engine.evaluate() {
        Some(result) => {
            record_detection(&state, &result).await;
            Json(result).into_response()
        }
        None => error(
            StatusCode::BAD_REQUEST,
            "insufficient buffered data for detection",
        ),
    }
}

async fn record_detection(state: &DashboardState, result: &DetectionResult) {
    let mut app_state = state.app_state.write().await;
    app_state.detections_run += 1;
    if result.is_leak {
        app_state.leaks_detected += 1;
    }
    app_state.latest_detection = Some(result.clone());
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub message: String,
    pub sample_count: usize,
    pub model: Option<ModelInfo>,
}

/// POST /api/v1/detection/train
///
/// Train the anomaly model on caller-supplied normal feature vectors.
pub async fn train_model(
    State(state): State<DashboardState>,
    Json(samples): Json<Vec<FeatureVector>>,
) -> Response {
    if samples.is_empty() {
        return error(StatusCode::BAD_REQUEST, "training set cannot be empty");
    }

    state.engine.train(&samples);
    state.app_state.write().await.model_trained = true;

    Json(TrainResponse {
        message: "Model trained successfully".to_string(),
        sample_count: samples.len(),
        model: state.engine.scorer().model_info(),
    })
    .into_response()
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/v1/detection/train-simulated
///
/// Generate normal-mode windows from the simulator and train on their
/// features. Runs in the background; the response returns immediately.
pub async fn train_simulated(State(state): State<DashboardState>) -> Json<MessageResponse> {
    tokio::spawn(async move {
        let window_size = state.engine.window_size();
        let samples = {
            let mut sim = lock_simulator(&state);
            let original_mode = sim.mode();
            sim.set_mode(SourceMode::Normal);

            let mut samples = Vec::with_capacity(10);
            for _ in 0..10 {
                let window: Vec<SensorReading> =
                    (0..window_size).map(|_| sim.next_reading()).collect();
                match features::extract(&window) {
                    Ok(f) => samples.push(f),
                    Err(e) => warn!(error = %e, "Skipping simulated training window"),
                }
            }

            sim.set_mode(original_mode);
            samples
        };

        state.engine.train(&samples);
        state.app_state.write().await.model_trained = true;
        info!(windows = samples.len(), "Simulated training complete");
    });

    Json(MessageResponse {
        message: "Simulated training started in background".to_string(),
    })
}

// ============================================================================
// Localization
// ============================================================================

/// POST /api/v1/localization/analyze
pub async fn analyze_network(
    State(state): State<DashboardState>,
    Json(request): Json<LocalizationRequest>,
) -> Json<LocalizationResult> {
    let result = state.network.localize(&request.node_pressures);
    debug!(
        suspect = %result.location_label(),
        confidence = result.confidence,
        "Manual localization request"
    );
    Json(result)
}

#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

/// GET /api/v1/localization/graph
pub async fn get_network_graph(State(state): State<DashboardState>) -> Json<GraphResponse> {
    Json(GraphResponse {
        nodes: state
            .network
            .node_ids()
            .into_iter()
            .map(String::from)
            .collect(),
        edges: state
            .network
            .segments()
            .iter()
            .map(|s| (s.from.clone(), s.to.clone()))
            .collect(),
    })
}

/// GET /api/v1/localization/geo-json
pub async fn get_network_geo_json(State(state): State<DashboardState>) -> Json<serde_json::Value> {
    Json(state.network.geo_json())
}

// ============================================================================
// Alerts
// ============================================================================

/// GET /api/v1/alerts/history?limit=N
pub async fn get_alert_history(
    State(state): State<DashboardState>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let Some(storage) = &state.storage else {
        return error(StatusCode::SERVICE_UNAVAILABLE, "history storage not available");
    };
    let limit = query.limit.unwrap_or(50);
    Json(storage.recent_alerts(limit)).into_response()
}

#[derive(Debug, Serialize)]
struct WsEnvelope<'a, T> {
    event: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

/// GET /api/v1/alerts/ws
///
/// WebSocket feed of leak alerts. Each subscriber gets its own copy of
/// every alert published after it connected.
pub async fn alerts_websocket(
    ws: WebSocketUpgrade,
    State(state): State<DashboardState>,
) -> Response {
    ws.on_upgrade(|socket| handle_alerts_socket(socket, state))
}

async fn handle_alerts_socket(socket: WebSocket, state: DashboardState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.alerts.subscribe();

    debug!("Alert WebSocket connected");

    let welcome = WsEnvelope::<()> {
        event: "connected",
        timestamp: Utc::now(),
        data: None,
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = sender.send(Message::Text(json)).await;
    }

    let mut send_task = tokio::spawn(async move {
        while let Ok(alert) = rx.recv().await {
            let envelope = WsEnvelope {
                event: "leak_alert",
                timestamp: Utc::now(),
                data: Some(alert),
            };
            let Ok(json) = serde_json::to_string(&envelope) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    debug!("Alert WebSocket disconnected");
}
