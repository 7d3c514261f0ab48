//! Study job API endpoints

use crate::ServiceClient;
use crate::error::Result;
use mapbridge_core::domain::job::{JobStatus, StudyJob};
use mapbridge_core::dto::job::{JobInputs, JobOutputs};
use reqwest::Method;
use uuid::Uuid;

impl ServiceClient {
    // =============================================================================
    // Study Job Lifecycle
    // =============================================================================

    /// Create a job from a study template
    ///
    /// # Arguments
    /// * `study_id` - The template study the job is instantiated from
    /// * `inputs` - Marshaled job inputs
    ///
    /// # Returns
    /// The created (not yet started) job
    pub async fn create_study_job(&self, study_id: Uuid, inputs: &JobInputs) -> Result<StudyJob> {
        let response = self
            .request(Method::POST, &format!("/v0/studies/{}/jobs", study_id))
            .json(inputs)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete a job and everything it produced on the service
    pub async fn delete_study_job(&self, study_id: Uuid, job_id: Uuid) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/v0/studies/{}/jobs/{}", study_id, job_id),
            )
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Start a created job
    ///
    /// # Returns
    /// The job status right after submission
    pub async fn start_study_job(&self, study_id: Uuid, job_id: Uuid) -> Result<JobStatus> {
        let response = self
            .request(
                Method::POST,
                &format!("/v0/studies/{}/jobs/{}:start", study_id, job_id),
            )
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the current status of a job
    pub async fn inspect_study_job(&self, study_id: Uuid, job_id: Uuid) -> Result<JobStatus> {
        let response = self
            .request(
                Method::POST,
                &format!("/v0/studies/{}/jobs/{}:inspect", study_id, job_id),
            )
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the results of a finished job
    pub async fn get_study_job_outputs(&self, study_id: Uuid, job_id: Uuid) -> Result<JobOutputs> {
        let response = self
            .request(
                Method::POST,
                &format!("/v0/studies/{}/jobs/{}/outputs", study_id, job_id),
            )
            .send()
            .await?;

        self.handle_response(response).await
    }
}
