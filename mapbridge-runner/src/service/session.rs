//! Remote job session
//!
//! Runs one task as one remote job: marshal the inputs, create and start the
//! job, poll it until it reaches a terminal state, then fill the task's
//! probes from the job results. The job is deleted however the session ends.

use mapbridge_core::domain::job::{JobState, JobStatus};
use mapbridge_core::domain::task::{Task, TaskStatus};
use mapbridge_core::dto::job::JobInputs;
use serde_json::Map;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::BridgeError;
use crate::repository::JobRepository;
use crate::service::marshal::Marshaler;

/// Executes tasks as remote jobs
pub struct JobSession {
    jobs: Arc<dyn JobRepository>,
    marshaler: Marshaler,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl JobSession {
    /// Creates a new session runner
    ///
    /// # Arguments
    /// * `jobs` - Remote job lifecycle
    /// * `marshaler` - Converts values to and from their remote form
    /// * `poll_interval` - Delay between two status checks of a job
    /// * `cancel` - Interrupts the wait for a job
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        marshaler: Marshaler,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            jobs,
            marshaler,
            poll_interval,
            timeout: None,
            cancel,
        }
    }

    /// Gives up on a job that has not finished after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs a task as a remote job
    ///
    /// A job that ends in a non-successful state is not an error: the
    /// returned task is marked `FAILED` with its probes unset.
    ///
    /// # Returns
    /// The task with its status and probe values set
    pub async fn run(&self, mut task: Task) -> Result<Task, BridgeError> {
        self.ensure_running()?;
        let inputs = self.marshal_inputs(&task).await?;

        // Uploads may have outlasted a shutdown request
        self.ensure_running()?;
        let job = self.jobs.create_job(&inputs).await?;
        info!("Created remote job {}", job.id);

        let result = self.drive(job.id, &mut task).await;
        self.cleanup(job.id).await;

        result.map(|_| task)
    }

    fn ensure_running(&self) -> Result<(), BridgeError> {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        Ok(())
    }

    async fn marshal_inputs(&self, task: &Task) -> Result<JobInputs, BridgeError> {
        let mut values = Map::new();
        for (name, spec) in &task.input {
            let value = self.marshaler.to_remote_input(name, spec).await?;
            values.insert(name.clone(), value);
        }
        Ok(JobInputs { values })
    }

    /// Starts the job and applies its outcome to the task
    async fn drive(&self, job_id: Uuid, task: &mut Task) -> Result<(), BridgeError> {
        let submitted = self.jobs.start_job(job_id).await?;
        debug!("Started remote job {} ({})", job_id, submitted.state);

        let status = self.wait_until_terminal(job_id).await?;
        if status.state != JobState::Success {
            error!("Remote job {} finished with state {}", job_id, status.state);
            task.fail(format!("Remote job {} finished with state {}", job_id, status.state));
            return Ok(());
        }

        let outputs = self.jobs.get_job_outputs(job_id).await?;
        if let Some(unknown) = outputs.results.keys().find(|name| !task.output.contains_key(*name)) {
            return Err(BridgeError::UnknownProbe(unknown.clone()));
        }

        let mut probes = HashMap::with_capacity(outputs.results.len());
        for (name, raw) in &outputs.results {
            if let Some(probe) = task.output.get(name) {
                let filled = self.marshaler.from_remote_result(name, probe, raw).await?;
                probes.insert(name.clone(), filled);
            }
        }

        task.output.extend(probes);
        task.status = TaskStatus::Success;
        task.error = None;
        info!("Remote job {} succeeded", job_id);
        Ok(())
    }

    /// Polls the job until it reaches a terminal state
    async fn wait_until_terminal(&self, job_id: Uuid) -> Result<JobStatus, BridgeError> {
        let deadline = self.timeout.map(|timeout| (Instant::now() + timeout, timeout));

        loop {
            let status = self.jobs.inspect_job(job_id).await?;
            if status.state.is_terminal() {
                return Ok(status);
            }
            debug!("Remote job {} is {}", job_id, status.state);

            if let Some((deadline, timeout)) = deadline {
                if Instant::now() >= deadline {
                    return Err(BridgeError::JobTimeout { job_id, timeout });
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(BridgeError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn cleanup(&self, job_id: Uuid) {
        match self.jobs.delete_job(job_id).await {
            Ok(()) => debug!("Deleted remote job {}", job_id),
            Err(e) if e.is_not_found() => debug!("Remote job {} was already gone", job_id),
            Err(e) => warn!("Failed to delete remote job {}: {}", job_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fake::FakeRemote;
    use mapbridge_core::domain::task::{ParamSpec, ProbeSpec, ValueKind};
    use serde_json::{Value as JsonValue, json};

    fn session(remote: &Arc<FakeRemote>) -> JobSession {
        JobSession::new(
            remote.clone(),
            Marshaler::new(remote.clone()),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
    }

    fn integer_task(value: JsonValue) -> Task {
        let mut task = Task::default();
        task.input
            .insert("x".to_string(), ParamSpec::new(ValueKind::Integer, value));
        task.output
            .insert("x".to_string(), ProbeSpec::new(ValueKind::Integer));
        task
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_job_fills_probes() {
        let remote = Arc::new(FakeRemote::new().with_job_duration(Duration::from_secs(3)));

        let task = session(&remote).run(integer_task(json!("3"))).await.unwrap();

        assert_eq!(task.status, TaskStatus::Success);
        assert_eq!(task.output["x"].value, Some(json!(3)));
        assert_eq!(remote.created(), 1);
        assert_eq!(remote.deleted().len(), 1);
        assert_eq!(remote.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_marks_task_failed() {
        let remote = Arc::new(FakeRemote::new().with_final_state(JobState::Failed));

        let task = session(&remote).run(integer_task(json!(1))).await.unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.output["x"].value.is_none());
        assert!(task.error.as_deref().unwrap().contains("FAILED"));
        assert_eq!(remote.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_job_is_a_failure() {
        let remote = Arc::new(FakeRemote::new().with_final_state(JobState::Aborted));

        let task = session(&remote).run(integer_task(json!(1))).await.unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_probe_still_deletes_job() {
        let remote = Arc::new(FakeRemote::new());
        let mut task = integer_task(json!(1));
        task.output.clear();
        task.output
            .insert("y".to_string(), ProbeSpec::new(ValueKind::Integer));

        let err = session(&remote).run(task).await.unwrap_err();

        assert!(matches!(err, BridgeError::UnknownProbe(ref name) if name == "x"));
        assert_eq!(remote.deleted().len(), 1);
        assert_eq!(remote.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_timeout() {
        let remote = Arc::new(FakeRemote::new().with_job_duration(Duration::from_secs(60)));
        let session = session(&remote).with_timeout(Some(Duration::from_secs(2)));

        let err = session.run(integer_task(json!(1))).await.unwrap_err();

        assert!(matches!(err, BridgeError::JobTimeout { timeout, .. } if timeout == Duration::from_secs(2)));
        assert_eq!(remote.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let remote = Arc::new(FakeRemote::new().with_job_duration(Duration::from_secs(60)));
        let cancel = CancellationToken::new();
        let session = JobSession::new(
            remote.clone(),
            Marshaler::new(remote.clone()),
            Duration::from_secs(1),
            cancel.clone(),
        );

        let handle = tokio::spawn(async move { session.run(integer_task(json!(1))).await });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        cancel.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled));
        assert_eq!(remote.deleted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_session_creates_no_job() {
        let remote = Arc::new(FakeRemote::new());
        let cancel = CancellationToken::new();
        let session = JobSession::new(
            remote.clone(),
            Marshaler::new(remote.clone()),
            Duration::from_secs(1),
            cancel.clone(),
        );
        cancel.cancel();

        let mut task = integer_task(json!(1));
        task.input.insert(
            "doc".to_string(),
            ParamSpec::new(ValueKind::StructuredFile, json!({"a": 1})).with_filename("x.json"),
        );
        let err = session.run(task).await.unwrap_err();

        assert!(matches!(err, BridgeError::Cancelled));
        assert_eq!(remote.created(), 0);
        assert_eq!(remote.uploads(), 0);
    }

    #[tokio::test]
    async fn test_structured_file_round_trip() {
        let remote = Arc::new(FakeRemote::new().with_job_duration(Duration::from_millis(20)));
        let session = JobSession::new(
            remote.clone(),
            Marshaler::new(remote.clone()),
            Duration::from_millis(10),
            CancellationToken::new(),
        );

        let mut task = Task::default();
        task.input.insert(
            "doc".to_string(),
            ParamSpec::new(ValueKind::StructuredFile, json!({"a": 1})).with_filename("x.json"),
        );
        task.output.insert(
            "doc".to_string(),
            ProbeSpec::new(ValueKind::StructuredFile).with_filename("x.json"),
        );

        let task = session.run(task).await.unwrap();

        assert_eq!(task.status, TaskStatus::Success);
        assert_eq!(task.output["doc"].value, Some(json!({"a": 1})));
        assert_eq!(remote.uploads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marshal_error_creates_no_job() {
        let remote = Arc::new(FakeRemote::new());

        let err = session(&remote)
            .run(integer_task(json!("three")))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Marshal { .. }));
        assert_eq!(remote.created(), 0);
    }
}
