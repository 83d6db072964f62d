mod app;
mod config;
mod dashboard;
mod errors;
mod external;
mod logging;
mod models;
mod services;
mod state;

use anyhow::Context;
use tokio::io::BufReader;

use crate::config::AppConfig;
use crate::dashboard::{run_interactive, ConsoleSurface, DashboardSession};
use crate::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        "🚀 Index forecast starting (provider {:?}, history from {}, {} alignment)",
        config.provider,
        config.history_start,
        config.alignment
    );

    let chart_dir = config.chart_output_dir.clone();
    let state = app::create_app(config)?;
    let mut session = DashboardSession::new(state)?;

    let mut surface = ConsoleSurface::new(std::io::stdout(), chart_dir);
    let input = BufReader::new(tokio::io::stdin());
    run_interactive(&mut session, input, &mut surface).await?;

    tracing::info!("👋 Index forecast exiting");
    Ok(())
}
