//! Task queue bridge
//!
//! Polls the inbox for commands, runs each new batch through the worker pool
//! and publishes the processed tasks to the outbox. A batch id is processed
//! at most once in a row: the inbox keeps its last document until the
//! producer replaces it.

use mapbridge_core::domain::task::TaskStatus;
use mapbridge_core::dto::mailbox::{Command, InboxDocument, OutboxDocument};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::repository::Mailbox;
use crate::service::WorkerPool;

/// Waiting messages are only logged on every Nth poll
const WAIT_LOG_EVERY: u64 = 10;

/// Where the bridge is in its polling cycle
#[derive(Debug, Clone)]
pub enum BridgeState {
    /// No inbox document exists yet
    AwaitInbox,
    /// Waiting for a command the bridge has not acted on
    AwaitCommand,
    /// A new batch is ready to run
    Processing(InboxDocument),
    Stopped,
}

/// Polling loop between the mailbox and the worker pool
pub struct TaskQueueBridge {
    mailbox: Arc<dyn Mailbox>,
    pool: WorkerPool,
    worker_count: usize,
    poll_interval: Duration,
    cancel: CancellationToken,
    state: BridgeState,
    last_batch_id: Option<String>,
    waits: u64,
}

impl TaskQueueBridge {
    /// Creates a new bridge
    ///
    /// # Arguments
    /// * `mailbox` - Source of batches and sink of results
    /// * `pool` - Runs the tasks of a batch
    /// * `worker_count` - Max tasks of a batch running at once
    /// * `poll_interval` - Sleep between two iterations of the loop
    /// * `cancel` - Stops the loop at the next suspension point
    pub fn new(
        mailbox: Arc<dyn Mailbox>,
        pool: WorkerPool,
        worker_count: usize,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            mailbox,
            pool,
            worker_count,
            poll_interval,
            cancel,
            state: BridgeState::AwaitInbox,
            last_batch_id: None,
            waits: 0,
        }
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    /// Runs the loop until a stop command or cancellation
    ///
    /// # Returns
    /// An error only for fatal conditions, such as an unknown command
    pub async fn run(&mut self) -> Result<(), BridgeError> {
        info!(
            "Bridge started ({} worker(s), polling every {:?})",
            self.worker_count, self.poll_interval
        );

        loop {
            self.step().await?;
            if matches!(self.state, BridgeState::Stopped) {
                info!("Bridge stopped");
                return Ok(());
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Shutdown requested, stopping bridge");
                    self.state = BridgeState::Stopped;
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Performs one transition of the state machine
    pub async fn step(&mut self) -> Result<(), BridgeError> {
        let state = std::mem::replace(&mut self.state, BridgeState::Stopped);
        self.state = match state {
            BridgeState::AwaitInbox => self.await_inbox().await?,
            BridgeState::AwaitCommand => self.await_command().await?,
            BridgeState::Processing(doc) => self.process(doc).await?,
            BridgeState::Stopped => BridgeState::Stopped,
        };
        Ok(())
    }

    async fn await_inbox(&mut self) -> Result<BridgeState, BridgeError> {
        match self.mailbox.try_get_inbox().await {
            Ok(None) => {
                self.log_wait("Waiting for the inbox to appear");
                Ok(BridgeState::AwaitInbox)
            }
            Ok(Some(_)) | Err(BridgeError::MalformedInbox(_)) => {
                info!("Inbox found");
                self.waits = 0;
                Ok(BridgeState::AwaitCommand)
            }
            Err(e) => Err(e),
        }
    }

    async fn await_command(&mut self) -> Result<BridgeState, BridgeError> {
        let doc = match self.mailbox.try_get_inbox().await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                warn!("Inbox disappeared, waiting for a new one");
                return Ok(BridgeState::AwaitInbox);
            }
            Err(BridgeError::MalformedInbox(e)) => {
                self.log_wait(&format!("Ignoring unreadable inbox: {}", e));
                return Ok(BridgeState::AwaitCommand);
            }
            Err(e) => return Err(e),
        };

        let command = doc
            .command()
            .map_err(|e| BridgeError::Configuration(e.to_string()))?;

        match command {
            Command::Stop => {
                info!("Received stop command");
                Ok(BridgeState::Stopped)
            }
            Command::Run if self.last_batch_id.as_deref() == Some(doc.uuid.as_str()) => {
                self.log_wait("Waiting for a new batch");
                Ok(BridgeState::AwaitCommand)
            }
            Command::Run => {
                info!("Received batch {} with {} task(s)", doc.uuid, doc.tasks.len());
                self.waits = 0;
                Ok(BridgeState::Processing(doc))
            }
        }
    }

    async fn process(&mut self, doc: InboxDocument) -> Result<BridgeState, BridgeError> {
        let started = Instant::now();
        let uuid = doc.uuid;
        let tasks = self.pool.run_batch(doc.tasks, self.worker_count).await;

        if self.cancel.is_cancelled() {
            warn!("Batch {} interrupted by shutdown, outbox left untouched", uuid);
            return Ok(BridgeState::Stopped);
        }

        let failed = tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Success)
            .count();
        let total = tasks.len();

        self.mailbox
            .put_outbox(&OutboxDocument {
                uuid: uuid.clone(),
                tasks,
            })
            .await?;

        info!(
            "Finished batch {} in {:?}: {} task(s), {} failed",
            uuid,
            started.elapsed(),
            total,
            failed
        );
        self.last_batch_id = Some(uuid);
        Ok(BridgeState::AwaitCommand)
    }

    fn log_wait(&mut self, message: &str) {
        if self.waits % WAIT_LOG_EVERY == 0 {
            info!("{} ({} poll(s) so far)", message, self.waits);
        } else {
            debug!("{}", message);
        }
        self.waits += 1;
    }
}
