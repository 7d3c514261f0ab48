//! Job command handlers
//!
//! Inspects or removes remote jobs directly, e.g. jobs left behind by a
//! bridge that was killed mid-batch.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use mapbridge_core::domain::job::{JobState, JobStatus};
use uuid::Uuid;

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Show the state of a remote job
    Inspect {
        /// Job ID
        id: Uuid,

        /// Study template the job was created from
        #[arg(short, long, env = "MAPBRIDGE_TEMPLATE_ID")]
        study: Uuid,
    },
    /// Delete a remote job
    Delete {
        /// Job ID
        id: Uuid,

        /// Study template the job was created from
        #[arg(short, long, env = "MAPBRIDGE_TEMPLATE_ID")]
        study: Uuid,
    },
}

/// Handle job commands
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.service_client();

    match command {
        JobCommands::Inspect { id, study } => {
            let status = client
                .inspect_study_job(study, id)
                .await
                .with_context(|| format!("Failed to inspect job {}", id))?;
            print_job_status(&status);
        }
        JobCommands::Delete { id, study } => {
            client
                .delete_study_job(study, id)
                .await
                .with_context(|| format!("Failed to delete job {}", id))?;
            println!("{}", "✓ Job deleted".green().bold());
            println!("  ID: {}", id.to_string().cyan());
        }
    }

    Ok(())
}

/// Print the status of a remote job
fn print_job_status(status: &JobStatus) {
    println!("{}", "Job Status:".bold());
    println!("  ID:        {}", status.job_id.to_string().cyan());
    println!("  State:     {}", colorize_state(status.state));

    if let Some(progress) = status.progress {
        println!("  Progress:  {}%", progress);
    }

    let times = [
        ("Submitted", status.submitted_at),
        ("Started", status.started_at),
        ("Stopped", status.stopped_at),
    ];
    for (label, time) in times {
        if let Some(time) = time {
            println!("  {:<10} {}", format!("{}:", label), time.format("%Y-%m-%d %H:%M:%S"));
        }
    }

    if let (Some(started), Some(stopped)) = (status.started_at, status.stopped_at) {
        let duration = stopped.signed_duration_since(started);
        println!("  Duration:  {}s", duration.num_seconds());
    }
}

/// Colorize job state for display
fn colorize_state(state: JobState) -> ColoredString {
    let label = state.to_string();
    match state {
        JobState::Success => label.green(),
        JobState::Failed | JobState::Aborted => label.red(),
        JobState::Started => label.blue(),
        JobState::Unknown => label.dimmed(),
        _ => label.yellow(),
    }
}
