//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use swarmcast_core::SwarmcastConfig;
use swarmcast_core::torrent::{info_hash_from_bytes, parse_metainfo};
use tokio::fs;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Inspect a torrent file: name, size, file listing, content identifier
    Inspect {
        /// Path to a .torrent file
        file: PathBuf,
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the content identifier of a torrent file
    Hash {
        /// Path to a .torrent file
        file: PathBuf,
    },
    /// Print the effective configuration derived from the environment
    Config,
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Inspect { file, json } => inspect(file, json).await,
        Commands::Hash { file } => hash(file).await,
        Commands::Config => show_config(),
    }
}

/// Parse and display a torrent file's metadata
async fn inspect(file: PathBuf, json: bool) -> anyhow::Result<()> {
    let bytes = fs::read(&file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let metainfo = parse_metainfo(&bytes).with_context(|| format!("parsing {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metainfo)?);
        return Ok(());
    }

    println!("Name:       {}", metainfo.name);
    println!("Identifier: {}", metainfo.info_hash);
    println!("Total size: {} bytes", metainfo.total_length);
    println!("Files:");
    for (path, file) in metainfo.relative_paths().iter().zip(&metainfo.files) {
        println!("  {:>12}  {path}", file.length);
    }

    Ok(())
}

/// Print only the content identifier
async fn hash(file: PathBuf) -> anyhow::Result<()> {
    let bytes = fs::read(&file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let info_hash =
        info_hash_from_bytes(&bytes).with_context(|| format!("parsing {}", file.display()))?;

    println!("{info_hash}");
    Ok(())
}

/// Show the configuration the streaming core would run with
fn show_config() -> anyhow::Result<()> {
    let config = SwarmcastConfig::from_env();
    println!("{config:#?}");
    Ok(())
}
