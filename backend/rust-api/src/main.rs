use anyhow::Context;
use std::sync::Arc;

use mathtutor_api::{config::Config, create_router, services::AppState, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let provider = telemetry::init()?;

    tracing::info!("Starting MathTutor API");

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(
        environment = %std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string()),
        backend = ?config.database_backend,
        model = %config.gemini.model,
        "Configuration loaded"
    );
    let port = config.port;

    let app_state = Arc::new(
        AppState::new(config)
            .await
            .context("Failed to initialize application state")?,
    );
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    telemetry::shutdown(provider);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
