use dotenvy::dotenv;
use panel_api::config::get_configuration;
use panel_api::middleware::ApiKeyGate;
use panel_api::services::{Database, PanelClient, SessionCache};
use panel_api::startup::build_router;
use panel_api::AppState;
use service_core::middleware::install_recorder;
use service_core::observability::init_tracing;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(&settings.telemetry)?;
    let metrics_handle = install_recorder()?;

    let base_path = settings.server.base_path();

    let database = Database::connect(&settings.database).await?;
    let gate = ApiKeyGate::from_env(&base_path, Arc::new(database));
    if gate.is_enabled() {
        info!(scope = %format!("{}api/", base_path), "API key login enabled");
    } else {
        info!("API key login disabled");
    }

    let panel = Arc::new(PanelClient::new(settings.panel)?);
    info!(panel = %panel.base_url(), "Delegating inbound operations to panel");

    let state = AppState::new(panel.clone(), panel.clone(), panel).with_metrics(metrics_handle);
    let sessions = SessionCache::new(settings.server.session_capacity);
    let app = build_router(state, gate, sessions, &settings.server);

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting panel-api on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
