use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crm_gateway::config::{load_effective, GatewayConfig};
use crm_gateway::routing::{RouteTable, Router};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the CRM API gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a running gateway's aggregate health
    Health {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },
    /// Print the route table in match order
    Routes {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show which service a request path would be forwarded to
    Resolve {
        path: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Health { url } => {
            let res = reqwest::Client::new()
                .get(format!("{}/health", url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Routes { config } => {
            let config = load_effective(config.as_deref())?;
            let router = build_router(&config)?;
            println!("mount prefix: {}", router.mount_prefix());
            for (route, paths) in router.mounted_prefixes() {
                println!("{:<12} {}", route.name(), route.base_url());
                for path in paths {
                    println!("{:<12}   {}", "", path);
                }
            }
        }
        Commands::Resolve { path, config } => {
            let config = load_effective(config.as_deref())?;
            resolve(&config, &path)?;
        }
    }

    Ok(())
}

fn build_router(config: &GatewayConfig) -> Result<Router, Box<dyn std::error::Error>> {
    let table = Arc::new(RouteTable::from_services(&config.services)?);
    Ok(Router::new(table, config.gateway.mount_prefix.clone()))
}

fn resolve(config: &GatewayConfig, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let router = build_router(config)?;

    match router.resolve(path)? {
        Some(resolved) => {
            println!("service:  {}", resolved.service_name);
            println!("path:     {}", resolved.forwarded_path);
            println!("upstream: {}", resolved.upstream);
        }
        None => println!("no service owns {}", path),
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Gateway reported status {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
