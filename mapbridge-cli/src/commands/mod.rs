//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod batch;
mod evaluate;
mod job;

pub use batch::BatchCommands;
pub use job::JobCommands;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Batch management through the mailbox
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
    /// Evaluate parameter sets and print their probe values
    Evaluate {
        /// JSON file holding an array of parameter objects
        params: PathBuf,

        /// JSON file describing the input and output of every task
        #[arg(short, long)]
        template: PathBuf,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Remote job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Batch { command } => batch::handle_batch_command(command, config).await,
        Commands::Evaluate {
            params,
            template,
            timeout,
        } => evaluate::evaluate(config, &params, &template, timeout).await,
        Commands::Job { command } => job::handle_job_command(command, config).await,
    }
}
