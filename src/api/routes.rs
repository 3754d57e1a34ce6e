//! API route definitions.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{handlers, DashboardState};

/// Build the full application router.
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .nest("/api/v1/simulation", simulation_routes())
        .nest("/api/v1/detection", detection_routes())
        .nest("/api/v1/localization", localization_routes())
        .nest("/api/v1/alerts", alert_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn simulation_routes() -> Router<DashboardState> {
    Router::new()
        .route("/status", get(handlers::get_simulation_status))
        .route("/mode/:mode", post(handlers::set_simulation_mode))
        .route("/data", get(handlers::get_simulation_data))
        .route("/history", get(handlers::get_sensor_history))
}

fn detection_routes() -> Router<DashboardState> {
    Router::new()
        .route("/extract", post(handlers::extract_features))
        .route("/detect", get(handlers::run_detection))
        .route("/train", post(handlers::train_model))
        .route("/train-simulated", post(handlers::train_simulated))
}

fn localization_routes() -> Router<DashboardState> {
    Router::new()
        .route("/analyze", post(handlers::analyze_network))
        .route("/graph", get(handlers::get_network_graph))
        .route("/geo-json", get(handlers::get_network_geo_json))
}

fn alert_routes() -> Router<DashboardState> {
    Router::new()
        .route("/history", get(handlers::get_alert_history))
        .route("/ws", get(handlers::alerts_websocket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertBus;
    use crate::config::defaults::DEFAULT_DROP_THRESHOLD;
    use crate::config::{DetectionConfig, SeverityConfig, SimulationConfig, TopologyConfig};
    use crate::detection::DetectionEngine;
    use crate::localization::NetworkModel;
    use crate::simulation::SensorSimulator;
    use crate::types::AppState;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use std::sync::{Arc, Mutex};
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    fn test_state() -> DashboardState {
        DashboardState {
            app_state: Arc::new(RwLock::new(AppState::default())),
            engine: Arc::new(DetectionEngine::new(
                &DetectionConfig::default(),
                SeverityConfig::default(),
            )),
            network: Arc::new(
                NetworkModel::from_config(&TopologyConfig::default(), DEFAULT_DROP_THRESHOLD)
                    .unwrap(),
            ),
            simulator: Arc::new(Mutex::new(SensorSimulator::new(
                &SimulationConfig::default(),
            ))),
            storage: None,
            alerts: AlertBus::new(),
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state());
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "Initializing");
        assert_eq!(json["model_trained"], false);
    }

    #[tokio::test]
    async fn test_simulation_status() {
        let app = build_router(test_state());
        let response = app.oneshot(get("/api/v1/simulation/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["current_mode"], "normal");
        assert_eq!(json["is_active"], true);
    }

    #[tokio::test]
    async fn test_set_mode_valid() {
        let state = test_state();
        let app = build_router(state.clone());
        let response = app
            .oneshot(post_json("/api/v1/simulation/mode/major_burst", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.simulator.lock().unwrap().mode(),
            crate::types::SourceMode::MajorBurst
        );
    }

    #[tokio::test]
    async fn test_set_mode_invalid_is_400() {
        let app = build_router(test_state());
        let response = app
            .oneshot(post_json("/api/v1/simulation/mode/tsunami", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_simulation_data_advances_ticks() {
        let state = test_state();
        let app = build_router(state.clone());
        let response = app.oneshot(get("/api/v1/simulation/data")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.simulator.lock().unwrap().tick_count(), 1);
    }

    #[tokio::test]
    async fn test_history_without_storage_is_503() {
        let app = build_router(test_state());
        let response = app.oneshot(get("/api/v1/simulation/history")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_extract_empty_window_is_400() {
        let app = build_router(test_state());
        let response = app
            .oneshot(post_json("/api/v1/detection/extract", "[]"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_extract_valid_window() {
        let app = build_router(test_state());
        let body = serde_json::json!([
            {
                "timestamp": "2026-08-23T10:00:00Z",
                "pressure": 5.0,
                "flow_rate": 100.0,
                "acoustic_signal": 10.0,
                "mode": "normal"
            },
            {
                "timestamp": "2026-08-23T10:00:01Z",
                "pressure": 4.8,
                "flow_rate": 101.0,
                "acoustic_signal": 11.0,
                "mode": "normal"
            }
        ]);
        let response = app
            .oneshot(post_json("/api/v1/detection/extract", &body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["sample_count"], 2);
        assert_eq!(json["avg_pressure"], 4.9);
    }

    #[tokio::test]
    async fn test_detect_with_empty_buffer_is_400() {
        let app = build_router(test_state());
        let response = app.oneshot(get("/api/v1/detection/detect")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_train_empty_set_is_400() {
        let app = build_router(test_state());
        let response = app
            .oneshot(post_json("/api/v1/detection/train", "[]"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_localization_analyze() {
        let app = build_router(test_state());
        let body = serde_json::json!({
            "node_pressures": { "Tank": 5.5, "A": 4.0 }
        });
        let response = app
            .oneshot(post_json("/api/v1/localization/analyze", &body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["suspected_segment"][0], "Tank");
        assert_eq!(json["suspected_segment"][1], "A");
        assert_eq!(json["confidence"], 0.95);
    }

    #[tokio::test]
    async fn test_localization_graph() {
        let app = build_router(test_state());
        let response = app.oneshot(get("/api/v1/localization/graph")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["nodes"].as_array().unwrap().len(), 5);
        assert_eq!(json["edges"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_localization_geo_json() {
        let app = build_router(test_state());
        let response = app
            .oneshot(get("/api/v1/localization/geo-json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["type"], "FeatureCollection");
    }

    #[tokio::test]
    async fn test_alert_history_without_storage_is_503() {
        let app = build_router(test_state());
        let response = app.oneshot(get("/api/v1/alerts/history")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_alert_history_with_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = test_state();
        state.storage = Some(
            crate::storage::HistoryStore::open(dir.path().join("test.db"), 100, 100).unwrap(),
        );
        let app = build_router(state);
        let response = app.oneshot(get("/api/v1/alerts/history")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = build_router(test_state());
        let response = app.oneshot(get("/api/v1/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
