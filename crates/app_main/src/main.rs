//! RefBoard - reference board with live folder sync
//!
//! Headless front end driving the core from the command line.

mod app;
mod cli;

use anyhow::Result;
use app_core::AppConfig;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging and panic hook first
    let _log = app_log::init(config.general.log_retention_days)?;
    tracing::info!("RefBoard starting...");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(app::run(cli, config))
}
