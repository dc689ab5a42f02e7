//! remora binary entry point.

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use remora::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    remora_logging::init_subscriber(settings.logging.level, settings.logging.format);
    let metrics =
        remora_server::metrics::install_recorder().context("failed to install metrics recorder")?;

    remora::run(settings, Some(metrics)).await
}
