//! In-memory remote service and mailbox for tests
//!
//! Jobs finish a fixed time after they are started (or after `delay_ms`
//! milliseconds when that input is present). A finished job echoes its
//! inputs back as results; uploaded files are echoed wrapped in a zip
//! archive, the way the service packs result files.

use async_trait::async_trait;
use mapbridge_client::{ClientError, Result};
use mapbridge_core::domain::file::FileHandle;
use mapbridge_core::domain::job::{JobState, JobStatus, StudyJob};
use mapbridge_core::dto::job::{JobInputs, JobOutputs};
use mapbridge_core::dto::mailbox::{InboxDocument, OutboxDocument};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::{FileRepository, JobRepository, Mailbox};
use crate::error::BridgeError;

struct StoredFile {
    filename: String,
    content: Vec<u8>,
}

struct FakeJob {
    inputs: JobInputs,
    duration: Duration,
    started_at: Option<Instant>,
    done: bool,
}

#[derive(Default)]
struct FakeState {
    files: HashMap<Uuid, StoredFile>,
    jobs: HashMap<Uuid, FakeJob>,
    created: usize,
    deleted: Vec<Uuid>,
    uploads: usize,
    running: usize,
    max_running: usize,
}

pub struct FakeRemote {
    state: Mutex<FakeState>,
    job_duration: Duration,
    final_state: JobState,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            job_duration: Duration::from_millis(50),
            final_state: JobState::Success,
        }
    }

    pub fn with_job_duration(mut self, duration: Duration) -> Self {
        self.job_duration = duration;
        self
    }

    pub fn with_final_state(mut self, state: JobState) -> Self {
        self.final_state = state;
        self
    }

    pub fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn deleted(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn live_jobs(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    pub fn uploads(&self) -> usize {
        self.state.lock().unwrap().uploads
    }

    pub fn max_running(&self) -> usize {
        self.state.lock().unwrap().max_running
    }

    pub fn file_content(&self, id: Uuid) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(&id)
            .map(|f| f.content.clone())
    }

    /// Stores a zip archive holding the given entries
    pub fn store_archive(&self, entries: &[(&str, &[u8])]) -> FileHandle {
        let entries: Vec<(String, Vec<u8>)> = entries
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_vec()))
            .collect();
        let mut state = self.state.lock().unwrap();
        store(&mut state, "results.zip", build_archive(&entries))
    }

    fn results_for(&self, state: &mut FakeState, inputs: &JobInputs) -> HashMap<String, JsonValue> {
        let mut results = HashMap::new();
        for (name, value) in &inputs.values {
            let echoed = match FileHandle::from_json(value) {
                Ok(handle) if state.files.contains_key(&handle.id) => {
                    let file = &state.files[&handle.id];
                    let archive = build_archive(&[(file.filename.clone(), file.content.clone())]);
                    let packed = store(state, "results.zip", archive);
                    serde_json::to_value(packed).unwrap()
                }
                _ => value.clone(),
            };
            results.insert(name.clone(), echoed);
        }
        results
    }
}

fn store(state: &mut FakeState, filename: &str, content: Vec<u8>) -> FileHandle {
    let id = Uuid::new_v4();
    let handle = FileHandle {
        id,
        filename: filename.to_string(),
        content_type: Some("application/octet-stream".to_string()),
        checksum: Some(format!("{:x}", content.len())),
        e_tag: None,
    };
    state.files.insert(
        id,
        StoredFile {
            filename: filename.to_string(),
            content,
        },
    );
    handle
}

fn build_archive(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(name.as_str(), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn not_found(what: &str, id: Uuid) -> ClientError {
    ClientError::api_error(404, format!("{} {} not found", what, id))
}

#[async_trait]
impl JobRepository for FakeRemote {
    async fn create_job(&self, inputs: &JobInputs) -> Result<StudyJob> {
        let duration = inputs
            .values
            .get("delay_ms")
            .and_then(JsonValue::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(self.job_duration);

        let id = Uuid::new_v4();
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        state.jobs.insert(
            id,
            FakeJob {
                inputs: inputs.clone(),
                duration,
                started_at: None,
                done: false,
            },
        );
        Ok(StudyJob { id, name: None })
    }

    async fn start_job(&self, job_id: Uuid) -> Result<JobStatus> {
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| not_found("job", job_id))?;
        job.started_at = Some(Instant::now());

        state.running += 1;
        state.max_running = state.max_running.max(state.running);
        Ok(JobStatus::new(job_id, JobState::Pending))
    }

    async fn inspect_job(&self, job_id: Uuid) -> Result<JobStatus> {
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| not_found("job", job_id))?;

        let (job_state, finished_now) = match job.started_at {
            None => (JobState::NotStarted, false),
            Some(started) if started.elapsed() >= job.duration => {
                let finished_now = !job.done;
                job.done = true;
                (self.final_state, finished_now)
            }
            Some(_) => (JobState::Started, false),
        };

        if finished_now {
            state.running -= 1;
        }
        Ok(JobStatus::new(job_id, job_state))
    }

    async fn get_job_outputs(&self, job_id: Uuid) -> Result<JobOutputs> {
        let mut state = self.state.lock().unwrap();
        let inputs = state
            .jobs
            .get(&job_id)
            .map(|job| job.inputs.clone())
            .ok_or_else(|| not_found("job", job_id))?;

        let results = self.results_for(&mut state, &inputs);
        Ok(JobOutputs { job_id, results })
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .remove(&job_id)
            .ok_or_else(|| not_found("job", job_id))?;

        if job.started_at.is_some() && !job.done {
            state.running -= 1;
        }
        state.deleted.push(job_id);
        Ok(())
    }
}

#[async_trait]
impl FileRepository for FakeRemote {
    async fn upload(&self, path: &Path) -> Result<FileHandle> {
        let content = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mut state = self.state.lock().unwrap();
        state.uploads += 1;
        Ok(store(&mut state, &filename, content))
    }

    async fn download(&self, file: &FileHandle, dest_dir: &Path) -> Result<PathBuf> {
        let content = self
            .file_content(file.id)
            .ok_or_else(|| not_found("file", file.id))?;
        let path = dest_dir.join(file.id.to_string());
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Mailbox kept in memory; every outbox write is recorded
#[derive(Default)]
pub struct MemoryMailbox {
    inbox: Mutex<Option<InboxDocument>>,
    outboxes: Mutex<Vec<OutboxDocument>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_inbox(&self, doc: InboxDocument) {
        *self.inbox.lock().unwrap() = Some(doc);
    }

    pub fn remove_inbox(&self) {
        *self.inbox.lock().unwrap() = None;
    }

    pub fn outboxes(&self) -> Vec<OutboxDocument> {
        self.outboxes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailbox for MemoryMailbox {
    async fn try_get_inbox(&self) -> std::result::Result<Option<InboxDocument>, BridgeError> {
        Ok(self.inbox.lock().unwrap().clone())
    }

    async fn put_outbox(&self, doc: &OutboxDocument) -> std::result::Result<(), BridgeError> {
        self.outboxes.lock().unwrap().push(doc.clone());
        Ok(())
    }
}
