//! Command-line interface for market-pulse

use anyhow::Context;
use clap::{Parser, Subcommand};
use pulse_analytics::{AnalyticsConfig, AnalyticsService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(about = "Historical market data trend and risk analysis", long_about = None)]
struct Args {
    /// Months of history to fetch
    #[arg(long, env = "PULSE_MONTHS", default_value_t = pulse_analytics::config::DEFAULT_MONTHS, global = true)]
    months: u32,

    /// Directory for persisted raw data and series (in memory when unset)
    #[arg(long, env = "PULSE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        #[arg(long, env = "PULSE_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
    /// Fetch and analyze one symbol, printing the result as JSON
    Analyze { symbol: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = pulse_utils::Config::from_env()?;
    pulse_utils::init_tracing_with(app_config.log_format);

    let args = Args::parse();
    info!(
        app = %app_config.app_name,
        environment = %app_config.environment,
        production = app_config.is_production(),
        "Starting"
    );

    let mut builder = AnalyticsConfig::builder()
        .months(args.months)
        .with_env_api_key();
    if let Some(dir) = args.data_dir {
        builder = builder.data_dir(dir);
    }
    let config = builder.build()?;
    let service = Arc::new(AnalyticsService::from_config(&config).await?);

    match args.command {
        Command::Serve { bind } => serve(service, bind).await,
        Command::Analyze { symbol } => analyze(&service, &symbol).await,
    }
}

async fn serve(service: Arc<AnalyticsService>, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("Listening on http://{bind}");

    axum::serve(listener, pulse_server::router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn analyze(service: &AnalyticsService, symbol: &str) -> anyhow::Result<()> {
    let report = service.ingest(symbol).await?;
    let analysis = service.analyze(Some(&report.symbol)).await?;

    let output = serde_json::json!({
        "ingest": report,
        "analysis": analysis,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
