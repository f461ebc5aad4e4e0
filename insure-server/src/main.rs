//! Insure HTTP Server binary

use anyhow::Context;
use insure_server::{app, AppState, ServerConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // Initialize logging, with OpenTelemetry export when requested
    let enable_otel = std::env::var("OTEL_ENABLED")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if enable_otel {
        insure_server::tracing::init_tracing_stack("insure-api", &config)?;
        info!("OpenTelemetry tracing enabled");
    } else {
        insure_server::tracing::init_console_logging(&config)?;
        info!("Console logging enabled (set OTEL_ENABLED=true for OpenTelemetry)");
    }

    info!("Starting Insure HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    insure_server::metrics::init_prometheus()?;
    insure_server::metrics::init_metrics();

    let addr = config.socket_addr()?;
    let state = AppState::load(config)
        .with_context(|| "Failed to load policy data".to_string())?;
    info!(
        policies = state.store.policy_count(),
        products = state.store.product_count(),
        data_dir = %state.config.data_dir.display(),
        "Policy store loaded"
    );
    insure_server::metrics::update_store_metrics(
        state.store.policy_count(),
        state.store.product_count(),
    );

    let app = app(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, shutting down gracefully...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    if enable_otel {
        info!("Flushing OpenTelemetry traces...");
        insure_server::tracing::shutdown_telemetry();
    }

    info!("Server shutdown complete");
    Ok(())
}
