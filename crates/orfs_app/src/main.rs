mod app;
mod cli;
mod render;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::Cli;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.open_settings()?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.snapshot().log_level);
    let _log_guard = orfs_core::logging::init_logging(&level)?;
    info!("orfs v{VERSION} starting");

    cli.run(settings).await
}
