use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use endpoint_trigger_service::config::{LoggingConfig, Settings};
use endpoint_trigger_service::endpoint::InMemoryEndpointStore;
use endpoint_trigger_service::schema::InMemorySchema;
use endpoint_trigger_service::server::{create_app, AppState};
use endpoint_trigger_service::transport::{HttpTransport, RecordingTransport, Transport};

/// Notifications kept in memory when running dry
const DRY_RUN_RETAINED: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    init_tracing(&settings.logging);
    tracing::info!("Configuration loaded");

    let schema = match &settings.catalog.schema_file {
        Some(path) => InMemorySchema::load_file(path)
            .with_context(|| format!("loading schema snapshot {}", path))?,
        None => {
            tracing::warn!("No schema snapshot configured, every bundle has no fields");
            InMemorySchema::new()
        }
    };

    let store = match &settings.catalog.endpoints_file {
        Some(path) => InMemoryEndpointStore::load_file(path, &settings.catalog.enabled_kinds)
            .with_context(|| format!("loading endpoints {}", path))?,
        None => {
            tracing::warn!("No endpoints file configured");
            InMemoryEndpointStore::new()
        }
    };
    tracing::info!(endpoints = store.len(), "Endpoints loaded");

    let transport: Arc<dyn Transport> = if settings.transport.dry_run {
        tracing::warn!("Dry run enabled, notifications are logged and not sent");
        Arc::new(RecordingTransport::new().retain_last(DRY_RUN_RETAINED))
    } else {
        Arc::new(HttpTransport::new(&settings.transport)?)
    };

    // Create application state
    let state = AppState::new(
        settings.clone(),
        Arc::new(store),
        Arc::new(schema),
        transport,
    );

    for unknown in state.service.unknown_rule_targets() {
        tracing::warn!(rule = %unknown, "Build rule references unknown content");
    }
    tracing::info!("Application state initialized");

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
