//! formsflow group API.
//!
//! ```text
//!     Client ──▶ http (auth, request id, metrics) ──▶ groups ──▶ keycloak ──▶ admin API
//!                                                        ▲
//!                           config watcher ── reload ────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use formsflow_api::config::load_config;
use formsflow_api::config::watcher::ConfigWatcher;
use formsflow_api::lifecycle::{shutdown_on_signal, Shutdown};
use formsflow_api::observability::{logging, metrics};
use formsflow_api::HttpServer;

#[derive(Parser)]
#[command(name = "formsflow-api")]
#[command(about = "Group and role administration API over Keycloak", long_about = None)]
struct Args {
    /// TOML configuration file; watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let _log_guard = logging::init_logging(&config.observability, "formsflow_api")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "formsflow-api starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        keycloak = %config.keycloak.url,
        realm = %config.keycloak.realm,
        multi_tenancy = config.tenancy.multi_tenancy_enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::from_config(config)?;

    let (_watcher, updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Arc::new(Shutdown::new());
    shutdown_on_signal(shutdown.clone());

    server.run(listener, updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
