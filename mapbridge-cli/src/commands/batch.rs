//! Batch command handlers
//!
//! Handles submitting batches to the bridge, stopping it, and showing the
//! results it published.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use mapbridge_core::domain::task::{Task, TaskStatus};
use mapbridge_core::dto::mailbox::OutboxDocument;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;

/// Batch subcommands
#[derive(Subcommand)]
pub enum BatchCommands {
    /// Submit a batch of tasks under a fresh batch id
    Submit {
        /// JSON file holding an array of tasks
        tasks: PathBuf,

        /// Wait for the bridge to publish the results
        #[arg(short, long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long, requires = "wait")]
        timeout: Option<u64>,
    },
    /// Ask the bridge to shut down
    Stop,
    /// Show the batch currently in the outbox
    Show,
}

/// Handle batch commands
///
/// # Arguments
/// * `command` - The batch command to execute
/// * `config` - The CLI configuration
pub async fn handle_batch_command(command: BatchCommands, config: &Config) -> Result<()> {
    match command {
        BatchCommands::Submit {
            tasks,
            wait,
            timeout,
        } => submit_batch(config, &tasks, wait, timeout).await,
        BatchCommands::Stop => stop_bridge(config).await,
        BatchCommands::Show => show_outbox(config).await,
    }
}

/// Reads a task list from a JSON file
fn read_tasks(path: &Path) -> Result<Vec<Task>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tasks file: {}", path.display()))?;
    parse_tasks(&content).with_context(|| format!("Invalid tasks file: {}", path.display()))
}

fn parse_tasks(content: &str) -> Result<Vec<Task>> {
    Ok(serde_json::from_str(content)?)
}

async fn submit_batch(config: &Config, path: &Path, wait: bool, timeout: Option<u64>) -> Result<()> {
    let tasks = read_tasks(path)?;
    let count = tasks.len();

    let mut mailbox = config.mailbox();
    if let Some(secs) = timeout {
        mailbox = mailbox.with_timeout(Duration::from_secs(secs));
    }

    let uuid = mailbox.submit(tasks).await?;

    println!("{}", "✓ Batch submitted".green().bold());
    println!("  ID:    {}", uuid.cyan());
    println!("  Tasks: {}", count);
    println!("  Inbox: {}", mailbox.inbox_path().display().to_string().dimmed());

    if wait {
        println!();
        println!("{}", "Waiting for results...".dimmed());
        let doc = mailbox.wait_for(&uuid).await?;
        println!();
        print_outbox(&doc);
    }

    Ok(())
}

async fn stop_bridge(config: &Config) -> Result<()> {
    let mailbox = config.mailbox();
    mailbox.stop().await?;

    println!("{}", "✓ Stop command sent".green().bold());
    Ok(())
}

async fn show_outbox(config: &Config) -> Result<()> {
    let mailbox = config.mailbox();

    match mailbox.read_outbox().await? {
        Some(doc) => print_outbox(&doc),
        None => println!(
            "{}",
            format!("No outbox found at {}.", mailbox.outbox_path().display()).yellow()
        ),
    }

    Ok(())
}

/// Print a processed batch with per-task status
fn print_outbox(doc: &OutboxDocument) {
    let failed = doc
        .tasks
        .iter()
        .filter(|task| task.status != TaskStatus::Success)
        .count();

    println!("{}", format!("Batch {}:", doc.uuid).bold());
    println!("  Tasks:  {}", doc.tasks.len());
    if failed > 0 {
        println!("  Failed: {}", failed.to_string().red());
    }
    println!();

    for (index, task) in doc.tasks.iter().enumerate() {
        println!("  {} Task {}  {}", "▸".cyan(), index, colorize_status(&task.status));

        let mut values: Vec<_> = task.output_values().into_iter().collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, value) in values {
            println!("    {} = {}", name.cyan(), value);
        }

        if let Some(error) = &task.error {
            println!("    {}", error.red());
        }
    }
}

/// Colorize task status for display
fn colorize_status(status: &TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Pending => "PENDING".yellow(),
        TaskStatus::Success => "SUCCESS".green(),
        TaskStatus::Failed => "FAILED".red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tasks() {
        let tasks = parse_tasks(
            r#"[
                {"input": {"x": {"type": "integer", "value": "3"}}, "output": {"y": {"type": "float"}}},
                {"input": {}, "output": {}}
            ]"#,
        )
        .unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert!(tasks[0].output.contains_key("y"));
    }

    #[test]
    fn test_parse_tasks_rejects_non_array() {
        assert!(parse_tasks(r#"{"tasks": []}"#).is_err());
    }

    #[test]
    fn test_read_tasks_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("tasks.json");

        let err = read_tasks(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("tasks.json"));
    }
}
