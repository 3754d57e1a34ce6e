//! AquaSentinel - Water Leak Detection and Localization System
//!
//! Continuous monitoring service for water distribution networks:
//! ingests pressure/flow/acoustic telemetry, detects leak signatures
//! with an isolation forest, classifies severity, and localizes the
//! suspected pipe segment from pressure gradients.
//!
//! # Usage
//!
//! ```bash
//! # Run with the built-in simulator in normal mode
//! cargo run --release
//!
//! # Start in a leak scenario with a pre-trained model
//! cargo run --release -- --mode small_leak --train
//! ```
//!
//! # Environment Variables
//!
//! - `AQUA_CONFIG`: Path to a TOML config file (default: ./aqua_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use aquasentinel::alerts::AlertBus;
use aquasentinel::api::{build_router, DashboardState};
use aquasentinel::config::{self, ServiceConfig};
use aquasentinel::detection::{features, DetectionEngine};
use aquasentinel::localization::NetworkModel;
use aquasentinel::notifications::NotificationManager;
use aquasentinel::pipeline::{IngestLoop, SimulatorSource};
use aquasentinel::simulation::SensorSimulator;
use aquasentinel::storage::HistoryStore;
use aquasentinel::types::{AppState, SensorReading, SourceMode};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "aquasentinel")]
#[command(about = "AquaSentinel water leak detection and localization service")]
#[command(version)]
struct CliArgs {
    /// Override the server bind address (default from config, "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Initial simulation mode: normal, small_leak, major_burst,
    /// intermittent, valve_fault
    #[arg(long, default_value = "normal")]
    mode: String,

    /// Train the anomaly model on simulated normal windows at startup
    #[arg(long)]
    train: bool,
}

// ============================================================================
// Task Names
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskName {
    HttpServer,
    IngestLoop,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::IngestLoop => write!(f, "IngestLoop"),
        }
    }
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    config::init(ServiceConfig::load());
    let cfg = config::get();

    let initial_mode = SourceMode::from_str(&args.mode)
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid --mode")?;

    info!("AquaSentinel starting");

    // Core components
    let engine = Arc::new(DetectionEngine::new(&cfg.detection, cfg.severity.clone()));
    let network = Arc::new(
        NetworkModel::from_config(&cfg.topology, cfg.localization.default_drop_threshold)
            .context("invalid network topology")?,
    );
    let simulator = {
        let mut sim = SensorSimulator::new(&cfg.simulation);
        sim.set_mode(initial_mode);
        Arc::new(Mutex::new(sim))
    };
    let storage = HistoryStore::open(
        &cfg.storage.path,
        cfg.storage.max_readings,
        cfg.storage.max_alerts,
    )
    .with_context(|| format!("failed to open history store at {}", cfg.storage.path))?;
    let alerts = AlertBus::new();
    let notifier = Arc::new(NotificationManager::new(&cfg.notifications));
    let app_state = Arc::new(RwLock::new(AppState {
        current_mode: initial_mode,
        ..AppState::default()
    }));

    if args.train {
        seed_train(&engine, &simulator, cfg.detection.window_size);
        app_state.write().await.model_trained = true;
    }

    // HTTP server
    let addr = args.addr.unwrap_or_else(|| cfg.server.addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Dashboard API listening");

    let dashboard = DashboardState {
        app_state: app_state.clone(),
        engine: engine.clone(),
        network: network.clone(),
        simulator: simulator.clone(),
        storage: Some(storage.clone()),
        alerts: alerts.clone(),
    };
    let app = build_router(dashboard);

    // Task spawning
    let cancel_token = CancellationToken::new();
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    {
        let cancel = cancel_token.clone();
        task_set.spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    cancel.cancelled().await;
                    info!("[HttpServer] Received shutdown signal");
                })
                .await;
            match result {
                Ok(()) => Ok(TaskName::HttpServer),
                Err(e) => Err(anyhow::anyhow!("HTTP server error: {}", e)),
            }
        });
    }

    {
        let ingest = IngestLoop::new(
            engine,
            network,
            app_state,
            storage,
            alerts,
            notifier,
            Duration::from_secs(cfg.simulation.tick_interval_secs),
            cancel_token.clone(),
        );
        let source = SimulatorSource::new(simulator);
        task_set.spawn(async move {
            ingest.run(source).await;
            Ok(TaskName::IngestLoop)
        });
    }

    // Ctrl-C triggers cooperative shutdown of every task
    {
        let cancel = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                cancel.cancel();
            }
        });
    }

    run_supervisor(&mut task_set, cancel_token).await
}

/// Train the model from simulated normal windows before the first tick.
fn seed_train(
    engine: &DetectionEngine,
    simulator: &Arc<Mutex<SensorSimulator>>,
    window_size: usize,
) {
    let samples = {
        let mut sim = match simulator.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let original_mode = sim.mode();
        sim.set_mode(SourceMode::Normal);

        let mut samples = Vec::with_capacity(10);
        for _ in 0..10 {
            let window: Vec<SensorReading> = (0..window_size).map(|_| sim.next_reading()).collect();
            match features::extract(&window) {
                Ok(f) => samples.push(f),
                Err(e) => warn!(error = %e, "Skipping startup training window"),
            }
        }

        sim.set_mode(original_mode);
        samples
    };

    engine.train(&samples);
    info!(windows = samples.len(), "Startup training complete");
}

/// Monitor tasks until shutdown; a task failure cancels the rest.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    loop {
        match task_set.join_next().await {
            Some(Ok(Ok(task_name))) => {
                info!("Task {} completed", task_name);
            }
            Some(Ok(Err(e))) => {
                error!("Task failed: {}", e);
                cancel_token.cancel();
                while task_set.join_next().await.is_some() {}
                return Err(e);
            }
            Some(Err(e)) => {
                error!("Task panicked: {}", e);
                cancel_token.cancel();
                while task_set.join_next().await.is_some() {}
                return Err(anyhow::anyhow!("task panicked: {}", e));
            }
            None => {
                info!("All tasks completed");
                return Ok(());
            }
        }
    }
}
