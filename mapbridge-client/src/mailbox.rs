//! Producer side of the file mailbox
//!
//! A driver hands batches to the bridge by writing the inbox document and
//! collects results by polling the outbox until a document with the same
//! batch id shows up. Both documents are replaced as a whole, never edited in
//! place, so readers only ever see complete JSON.

use mapbridge_core::domain::task::{ParamSpec, ProbeSpec, Task, TaskStatus};
use mapbridge_core::dto::mailbox::{INBOX_FILE_NAME, InboxDocument, OUTBOX_FILE_NAME, OutboxDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// Replaces `path` with `content` through a temp file and a rename
///
/// The temp file is created next to the target so the rename never crosses
/// file systems.
pub fn write_atomically(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Shape of the tasks built from plain parameter values
///
/// Parameters without an entry in `input` are sent as scalars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskTemplate {
    #[serde(default)]
    pub input: HashMap<String, ParamSpec>,
    #[serde(default)]
    pub output: HashMap<String, ProbeSpec>,
}

impl TaskTemplate {
    /// Builds a pending task carrying the given parameter values
    pub fn instantiate(&self, params: HashMap<String, JsonValue>) -> Task {
        let input = params
            .into_iter()
            .map(|(name, value)| {
                let spec = match self.input.get(&name) {
                    Some(template) => ParamSpec {
                        kind: template.kind.clone(),
                        value,
                        filename: template.filename.clone(),
                    },
                    None => ParamSpec::new(Default::default(), value),
                };
                (name, spec)
            })
            .collect();

        let output = self
            .output
            .iter()
            .map(|(name, probe)| {
                let mut probe = probe.clone();
                probe.value = None;
                (name.clone(), probe)
            })
            .collect();

        Task {
            input,
            output,
            ..Task::default()
        }
    }
}

/// Client for submitting batches through the mailbox
#[derive(Debug, Clone)]
pub struct MailboxClient {
    inbox_path: PathBuf,
    outbox_path: PathBuf,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl MailboxClient {
    /// Creates a client for the mailbox living in the given directories
    ///
    /// # Arguments
    /// * `inbox_dir` - Directory the bridge reads `input_tasks.json` from
    /// * `outbox_dir` - Directory the bridge writes `output_tasks.json` to
    pub fn new(inbox_dir: impl AsRef<Path>, outbox_dir: impl AsRef<Path>) -> Self {
        Self {
            inbox_path: inbox_dir.as_ref().join(INBOX_FILE_NAME),
            outbox_path: outbox_dir.as_ref().join(OUTBOX_FILE_NAME),
            poll_interval: Duration::from_millis(100),
            timeout: None,
        }
    }

    /// How often the outbox is checked while waiting for results
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up waiting for results after this long
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn inbox_path(&self) -> &Path {
        &self.inbox_path
    }

    pub fn outbox_path(&self) -> &Path {
        &self.outbox_path
    }

    /// Writes a run command for the tasks under a fresh batch id
    ///
    /// # Returns
    /// The batch id to wait for
    pub async fn submit(&self, tasks: Vec<Task>) -> Result<String> {
        let uuid = Uuid::new_v4().to_string();
        self.write_inbox(&InboxDocument::run(uuid.clone(), tasks))
            .await?;
        info!("Submitted batch {}", uuid);
        Ok(uuid)
    }

    /// Asks the bridge to shut down
    pub async fn stop(&self) -> Result<()> {
        self.write_inbox(&InboxDocument::stop()).await?;
        info!("Sent stop command");
        Ok(())
    }

    /// Reads the current outbox, if any
    pub async fn read_outbox(&self) -> Result<Option<OutboxDocument>> {
        match tokio::fs::read_to_string(&self.outbox_path).await {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| ClientError::ParseError(format!("Invalid outbox document: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Polls the outbox until it holds the results of the given batch
    pub async fn wait_for(&self, uuid: &str) -> Result<OutboxDocument> {
        let started = Instant::now();

        loop {
            if let Some(doc) = self.read_outbox().await? {
                if doc.uuid == uuid {
                    return Ok(doc);
                }
                debug!("Outbox holds batch {}, waiting for {}", doc.uuid, uuid);
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(ClientError::Timeout(uuid.to_string()));
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Runs a batch of tasks and returns them with results filled in
    pub async fn evaluate_tasks(&self, tasks: Vec<Task>) -> Result<Vec<Task>> {
        let expected = tasks.len();
        let uuid = self.submit(tasks).await?;
        let doc = self.wait_for(&uuid).await?;

        if doc.tasks.len() != expected {
            return Err(ClientError::ParseError(format!(
                "Batch {} returned {} task(s), expected {}",
                uuid,
                doc.tasks.len(),
                expected
            )));
        }

        Ok(doc.tasks)
    }

    /// Evaluates parameter sets and returns the probe values of each
    ///
    /// Results are positional: entry `i` belongs to `param_sets[i]`. A task
    /// that did not succeed fails the whole evaluation with its diagnostic.
    pub async fn evaluate(
        &self,
        template: &TaskTemplate,
        param_sets: Vec<HashMap<String, JsonValue>>,
    ) -> Result<Vec<HashMap<String, JsonValue>>> {
        let tasks = param_sets
            .into_iter()
            .map(|params| template.instantiate(params))
            .collect();

        let results = self.evaluate_tasks(tasks).await?;

        results
            .into_iter()
            .enumerate()
            .map(|(index, task)| match task.status {
                TaskStatus::Success => Ok(task.output_values()),
                status => Err(ClientError::EvaluationFailed {
                    index,
                    message: task
                        .error
                        .unwrap_or_else(|| format!("task ended with status {}", status)),
                }),
            })
            .collect()
    }

    async fn write_inbox(&self, doc: &InboxDocument) -> Result<()> {
        let content = serde_json::to_vec(doc)
            .map_err(|e| ClientError::ParseError(format!("Failed to encode inbox: {}", e)))?;
        let path = self.inbox_path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;
        Ok(())
    }
}
