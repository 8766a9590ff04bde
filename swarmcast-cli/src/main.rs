//! Swarmcast CLI - Command-line interface
//!
//! Offline tooling around the Swarmcast core: metainfo inspection and
//! configuration diagnostics.

mod commands;

use clap::Parser;
use swarmcast_core::tracing_setup::CliLogLevel;

#[derive(Parser)]
#[command(name = "swarmcast")]
#[command(about = "Torrent metainfo tooling for the Swarmcast streaming core")]
struct Cli {
    /// Console log level
    #[arg(long, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    swarmcast_core::tracing_setup::init_tracing(cli.log_level.as_tracing_level(), None)
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    commands::handle_command(cli.command).await
}
