//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route table from validated configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, GatewayConfig, ValidationError};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

/// Start the gateway and serve until `shutdown` is triggered.
pub async fn start(config: GatewayConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    for service in &config.services {
        tracing::info!(
            service = %service.name,
            url = %service.url,
            prefixes = ?service.prefixes,
            "Service route configured"
        );
    }

    let server = HttpServer::new(config.clone())?;

    if config.observability.metrics_enabled {
        let address = &config.observability.metrics_address;
        let addr = address.parse::<SocketAddr>().map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidMetricsAddress(address.clone())])
        })?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}

/// Log a configuration failure, one line per validation error.
pub fn report_config_error(error: &ConfigError) {
    match error {
        ConfigError::Validation(errors) => {
            for e in errors {
                tracing::error!(error = %e, "Invalid configuration");
            }
        }
        other => tracing::error!(error = %other, "Failed to load configuration"),
    }
}
