//! CRM API Gateway
//!
//! Single entry point for the CRM microservices, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────────┐
//!                              │                     API GATEWAY                       │
//!                              │                                                       │
//!     Client Request           │  ┌─────────┐    ┌──────────────┐    ┌────────────┐   │
//!     ─────────────────────────┼─▶│  http   │───▶│   routing    │───▶│   proxy    │───┼──▶ user     :3001
//!        /api/<prefix>/...     │  │ server  │    │ strip /api,  │    │ forwarder  │───┼──▶ customer :3002
//!                              │  └─────────┘    │ first match  │    └─────┬──────┘───┼──▶ sales    :3003
//!                              │       ▲         └──────────────┘          │          │
//!     Client Response          │       │           404 on no match         ▼          │
//!     ◀────────────────────────┼───────┴──────────── relay ◀──── failure translator   │
//!                              │                                  (500/503 envelope)  │
//!                              │                                                       │
//!                              │  ┌─────────────────────────────────────────────────┐ │
//!                              │  │ config │ health (/health) │ observability │ life│ │
//!                              │  └─────────────────────────────────────────────────┘ │
//!                              └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use crm_gateway::config::{load_effective, ObservabilityConfig};
use crm_gateway::lifecycle::{signals, startup, Shutdown};
use crm_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "crm-gateway")]
#[command(about = "API gateway for the CRM services", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_effective(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init_logging(&ObservabilityConfig::default());
            startup::report_config_error(&e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        mount_prefix = %config.gateway.mount_prefix,
        request_timeout_secs = config.timeouts.request_secs,
        "crm-gateway starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    if let Err(e) = startup::start(config, &shutdown).await {
        tracing::error!(error = %e, "Gateway failed");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
