//! Worker pool dispatcher
//!
//! Runs the tasks of one batch as remote job sessions, at most
//! `worker_count` at a time. The pool lives only as long as the batch.

use mapbridge_core::domain::task::Task;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::service::session::JobSession;

/// Fans a batch out to concurrent job sessions
pub struct WorkerPool {
    session: Arc<JobSession>,
}

impl WorkerPool {
    pub fn new(session: Arc<JobSession>) -> Self {
        Self { session }
    }

    /// Runs every task of a batch
    ///
    /// A task whose session fails is returned `FAILED` with the error text
    /// and no probe values; the other tasks are not affected.
    ///
    /// # Returns
    /// The processed tasks, in input order
    pub async fn run_batch(&self, tasks: Vec<Task>, worker_count: usize) -> Vec<Task> {
        let semaphore = Arc::new(Semaphore::new(worker_count.max(1)));
        debug!("Dispatching {} task(s) on {} worker(s)", tasks.len(), worker_count);

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let session = Arc::clone(&self.session);
            let semaphore = Arc::clone(&semaphore);
            let original = task.clone();

            let handle = tokio::spawn(async move {
                // Held until the session (and its cleanup) is over
                let _permit = semaphore.acquire_owned().await;
                session.run(task).await
            });
            handles.push((original, handle));
        }

        let mut processed = Vec::with_capacity(handles.len());
        for (index, (original, handle)) in handles.into_iter().enumerate() {
            let task = match handle.await {
                Ok(Ok(task)) => task,
                Ok(Err(e)) => {
                    error!("Task {} failed: {}", index, e);
                    failed(original, e.to_string())
                }
                Err(e) => {
                    error!("Worker for task {} panicked: {}", index, e);
                    failed(original, format!("Worker panicked: {}", e))
                }
            };
            processed.push(task);
        }
        processed
    }
}

fn failed(mut task: Task, reason: String) -> Task {
    task.fail(reason);
    task
}
