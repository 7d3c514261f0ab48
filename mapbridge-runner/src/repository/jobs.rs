//! Jobs repository
//!
//! Handles the lifecycle of remote jobs created from the study template:
//! - Creating jobs with marshaled inputs
//! - Starting and inspecting them
//! - Fetching their results
//! - Deleting them

use async_trait::async_trait;
use mapbridge_client::{Result, ServiceClient};
use mapbridge_core::domain::job::{JobStatus, StudyJob};
use mapbridge_core::dto::job::{JobInputs, JobOutputs};
use std::sync::Arc;
use uuid::Uuid;

/// Repository trait for remote job operations
///
/// Every job lives under one study template, fixed when the repository is
/// built.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Creates a job with the given inputs
    async fn create_job(&self, inputs: &JobInputs) -> Result<StudyJob>;

    /// Starts a created job
    ///
    /// # Returns
    /// The status right after submission
    async fn start_job(&self, job_id: Uuid) -> Result<JobStatus>;

    /// Gets the current status of a job
    async fn inspect_job(&self, job_id: Uuid) -> Result<JobStatus>;

    /// Gets the results of a finished job, keyed by probe name
    async fn get_job_outputs(&self, job_id: Uuid) -> Result<JobOutputs>;

    /// Deletes a job
    async fn delete_job(&self, job_id: Uuid) -> Result<()>;
}

/// HTTP implementation of JobRepository
pub struct HttpJobRepository {
    client: Arc<ServiceClient>,
    template_id: Uuid,
}

impl HttpJobRepository {
    /// Creates a new HTTP job repository
    ///
    /// # Arguments
    /// * `client` - Shared service client
    /// * `template_id` - Study template jobs are created from
    pub fn new(client: Arc<ServiceClient>, template_id: Uuid) -> Self {
        Self {
            client,
            template_id,
        }
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn create_job(&self, inputs: &JobInputs) -> Result<StudyJob> {
        self.client.create_study_job(self.template_id, inputs).await
    }

    async fn start_job(&self, job_id: Uuid) -> Result<JobStatus> {
        self.client.start_study_job(self.template_id, job_id).await
    }

    async fn inspect_job(&self, job_id: Uuid) -> Result<JobStatus> {
        self.client.inspect_study_job(self.template_id, job_id).await
    }

    async fn get_job_outputs(&self, job_id: Uuid) -> Result<JobOutputs> {
        self.client
            .get_study_job_outputs(self.template_id, job_id)
            .await
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<()> {
        self.client.delete_study_job(self.template_id, job_id).await
    }
}
