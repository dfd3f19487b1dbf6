// src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use dog_health_check::{
    config::{self, Config},
    health::HealthCheckService,
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dog_health_check=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration, falling back to the built-in checks
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            config::load_config(&path).await?
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let health = Arc::new(HealthCheckService::from_config(&config.health_check)?);
    info!("Registered health checks: {}", health.keys().join(", "));

    let handler = RequestHandler::new(health, config.server.path.clone());

    info!(
        "Serving health checks on http://{}{}",
        config.server.bind_address, config.server.path
    );

    ServerBuilder::new(config.server.bind_address)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
