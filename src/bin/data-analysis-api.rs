//! formsflow data-analysis API: sentiment of submitted form text.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use formsflow_api::analysis::{load_model, AnalysisServer, SentimentStore};
use formsflow_api::config::load_config;
use formsflow_api::lifecycle::{shutdown_on_signal, Shutdown};
use formsflow_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "data-analysis-api")]
#[command(about = "Sentiment analysis API for form submissions", long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let _log_guard = logging::init_logging(&config.observability, "formsflow_api")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.analysis.model_id,
        database_support = %config.analysis.database_support,
        "data-analysis-api starting"
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

    let classifier = load_model(config.analysis.clone()).await?;

    let store = if config.analysis.database_enabled() {
        Some(SentimentStore::open(&config.analysis.store_path)?)
    } else {
        None
    };

    let server = AnalysisServer::new(&config, classifier, store)?;
    let listener = TcpListener::bind(&config.analysis.bind_address).await?;

    let shutdown = Arc::new(Shutdown::new());
    shutdown_on_signal(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
