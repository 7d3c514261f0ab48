//! Mapbridge CLI
//!
//! Command-line interface for driving the bridge: submitting batches to its
//! mailbox, evaluating parameter sets, and cleaning up remote jobs.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mapbridge")]
#[command(about = "Mapbridge task queue CLI", long_about = None)]
struct Cli {
    /// Directory holding the bridge inbox
    #[arg(long, env = "MAPBRIDGE_INPUT_DIR", default_value = ".")]
    inbox_dir: PathBuf,

    /// Directory holding the bridge outbox
    #[arg(long, env = "MAPBRIDGE_OUTPUT_DIR", default_value = ".")]
    outbox_dir: PathBuf,

    /// Remote service URL
    #[arg(long, env = "MAPBRIDGE_API_URL", default_value = "http://localhost:8006")]
    api_url: String,

    /// API key for the remote service
    #[arg(long, env = "OSPARC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API secret for the remote service
    #[arg(long, env = "OSPARC_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        inbox_dir: cli.inbox_dir,
        outbox_dir: cli.outbox_dir,
        api_url: cli.api_url,
        api_key: cli.api_key,
        api_secret: cli.api_secret,
    };

    handle_command(cli.command, &config).await
}
