//! Evaluate command handler
//!
//! Turns parameter sets into tasks through a template, runs them as one
//! batch and prints the probe values of every task as JSON.

use anyhow::{Context, Result};
use colored::*;
use mapbridge_client::TaskTemplate;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::config::Config;

/// Evaluate the parameter sets in `params_path`
///
/// # Arguments
/// * `config` - The CLI configuration
/// * `params_path` - JSON array of parameter objects
/// * `template_path` - Task template applied to every parameter object
/// * `timeout` - Seconds to wait for the results, unbounded when unset
pub async fn evaluate(
    config: &Config,
    params_path: &Path,
    template_path: &Path,
    timeout: Option<u64>,
) -> Result<()> {
    let template: TaskTemplate = read_json(template_path)?;
    let param_sets: Vec<HashMap<String, JsonValue>> = read_json(params_path)?;

    let mut mailbox = config.mailbox();
    if let Some(secs) = timeout {
        mailbox = mailbox.with_timeout(Duration::from_secs(secs));
    }

    eprintln!(
        "{}",
        format!("Evaluating {} parameter set(s)...", param_sets.len()).dimmed()
    );
    let results = mailbox.evaluate(&template, param_sets).await?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
