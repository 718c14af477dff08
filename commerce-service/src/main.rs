//! Commerce Service entry point.

use commerce_service::config::CommerceConfig;
use commerce_service::services::init_metrics;
use commerce_service::startup::Application;

use service_core::observability::init_tracing;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = CommerceConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    // Initialize tracing
    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        version = %config.service_version,
        "Starting commerce-service"
    );

    // Initialize metrics
    init_metrics();

    tracing::info!(
        port = config.common.port,
        database_url = %config.database.url,
        invoice_prefix = %config.invoicing.number_prefix,
        "Configuration loaded"
    );

    let app = Application::build(config).await.map_err(|e| {
        std::io::Error::other(format!("Failed to build application: {}", e))
    })?;

    tracing::info!(port = app.port(), "Commerce service started");

    app.run_until_shutdown(shutdown_signal()).await
}
