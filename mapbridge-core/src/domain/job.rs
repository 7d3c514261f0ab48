//! Remote job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job created on the remote execution service from a study template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyJob {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
}

/// Remote job state as reported by the execution service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Published,
    NotStarted,
    Pending,
    WaitingForResources,
    Started,
    Success,
    Failed,
    Aborted,
    /// Any state this client does not know about
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Whether the job will not change state anymore
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failed | JobState::Aborted)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobState::Unknown => "UNKNOWN",
            JobState::Published => "PUBLISHED",
            JobState::NotStarted => "NOT_STARTED",
            JobState::Pending => "PENDING",
            JobState::WaitingForResources => "WAITING_FOR_RESOURCES",
            JobState::Started => "STARTED",
            JobState::Success => "SUCCESS",
            JobState::Failed => "FAILED",
            JobState::Aborted => "ABORTED",
        };
        f.write_str(label)
    }
}

/// Status snapshot of a remote job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub state: JobState,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    /// Creates a status with only the state set
    pub fn new(job_id: Uuid, state: JobState) -> Self {
        Self {
            job_id,
            state,
            progress: None,
            submitted_at: None,
            started_at: None,
            stopped_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Success.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Aborted.is_terminal());
        assert!(!JobState::Started.is_terminal());
        assert!(!JobState::WaitingForResources.is_terminal());
    }

    #[test]
    fn test_unknown_state_is_tolerated() {
        let status: JobStatus = serde_json::from_value(serde_json::json!({
            "job_id": Uuid::new_v4(),
            "state": "SOMETHING_NEW",
            "progress": 10
        }))
        .unwrap();
        assert_eq!(status.state, JobState::Unknown);
        assert_eq!(status.progress, Some(10));
    }

    #[test]
    fn test_known_states_use_service_names() {
        let state: JobState = serde_json::from_value(serde_json::json!("WAITING_FOR_RESOURCES")).unwrap();
        assert_eq!(state, JobState::WaitingForResources);

        let aborted: JobState = serde_json::from_value(serde_json::json!("ABORTED")).unwrap();
        assert_eq!(aborted, JobState::Aborted);
        assert_eq!(serde_json::to_value(JobState::NotStarted).unwrap(), serde_json::json!("NOT_STARTED"));
    }
}
