use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use dwp_engine::scheduler::{Scheduler, SchedulerConfig};
use dwp_engine::store::StoreClient;
use dwp_engine::{catalog, config};

/// Polls DWP press machines over Modbus/TCP and writes finalized cycles
/// to PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "dwp_poll")]
struct Cli {
    /// Restrict polling to a single machine name.
    #[arg(short, long)]
    machine: Option<String>,

    /// Path to the system configuration TOML file.
    #[arg(long, default_value = "config/system.toml")]
    config: PathBuf,
}

struct AppState {
    store: Arc<StoreClient>,
    metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!("DWP poller starting");

    let engine_config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration — refusing to start");
            std::process::exit(1);
        }
    };

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    let store_client = match StoreClient::connect(
        &engine_config.database_url,
        engine_config.system.database.max_connections,
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            std::process::exit(1);
        }
    };

    if let Err(e) = store_client.migrate().await {
        tracing::error!(error = %e, "Failed to run PostgreSQL migrations");
        std::process::exit(1);
    }

    let store_client = Arc::new(store_client);

    let devices = match catalog::load_catalog(
        &store_client,
        engine_config.system.safety.allow_fallback_device_config,
    )
    .await
    {
        Ok(devices) => devices,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load device catalog");
            std::process::exit(1);
        }
    };

    if devices.is_empty() {
        tracing::error!("No devices available, refusing to start");
        std::process::exit(1);
    }

    tracing::info!(device_count = devices.len(), "Device catalog loaded");

    let scheduler = Scheduler::start(SchedulerConfig {
        devices,
        thresholds: Arc::new(engine_config.system.thresholds.clone()),
        modbus: engine_config.system.modbus.clone(),
        polling: engine_config.system.polling.clone(),
        store: Arc::clone(&store_client),
        machine_filter: cli.machine.clone(),
    });

    let state = Arc::new(AppState {
        store: Arc::clone(&store_client),
        metrics_handle,
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let port: u16 = std::env::var("ENGINE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!(port = port, "DWP poller listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    scheduler.shutdown();
    scheduler.join().await;

    tracing::info!("DWP poller stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let postgres_ok = state.store.health_check().await.is_ok();
    let status = if postgres_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = serde_json::json!({
        "status": if postgres_ok { "healthy" } else { "unhealthy" },
        "services": { "postgres": if postgres_ok { "healthy" } else { "unhealthy" } }
    });

    (status, Json(body))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
