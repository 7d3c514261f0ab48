//! Parameter marshaling
//!
//! Converts task parameters into values the remote service accepts as job
//! inputs, and job results back into probe values. File-backed kinds go
//! through the remote file storage; every temporary file lives in a temp
//! directory owned by the call, so it is removed on every exit path.

use mapbridge_core::domain::file::FileHandle;
use mapbridge_core::domain::task::{ParamSpec, ProbeSpec, ValueKind};
use serde_json::{Number, Value as JsonValue};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::BridgeError;
use crate::repository::FileRepository;

/// Converts between task values and their remote representation
#[derive(Clone)]
pub struct Marshaler {
    files: Arc<dyn FileRepository>,
}

impl Marshaler {
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self { files }
    }

    /// Converts a parameter into a job input value
    ///
    /// # Arguments
    /// * `name` - Parameter name, used in error messages
    /// * `spec` - The parameter to convert
    pub async fn to_remote_input(&self, name: &str, spec: &ParamSpec) -> Result<JsonValue, BridgeError> {
        match &spec.kind {
            ValueKind::StructuredFile => {
                let filename = plain_filename(name, spec.filename.as_deref())?;
                let content = serde_json::to_vec(&spec.value)
                    .map_err(|e| BridgeError::marshal(name, e))?;

                let dir = scratch_dir().await?;
                let path = dir.path().join(filename);
                tokio::fs::write(&path, content).await?;

                let handle = self.files.upload(&path).await?;
                debug!("Uploaded '{}' as file {}", name, handle.id);
                handle_to_value(name, &handle)
            }
            ValueKind::OpaqueFile => {
                let handle = FileHandle::from_json(&spec.value)
                    .map_err(|e| BridgeError::marshal(name, format!("invalid file handle: {}", e)))?;
                handle_to_value(name, &handle)
            }
            ValueKind::Integer => coerce_integer(name, &spec.value),
            ValueKind::Float => coerce_float(name, &spec.value),
            ValueKind::Scalar(_) => Ok(spec.value.clone()),
            ValueKind::Unsupported(kind) => Err(unsupported(name, kind)),
        }
    }

    /// Converts a job result into the value of a probe
    ///
    /// # Arguments
    /// * `name` - Probe name, used in error messages
    /// * `probe` - The probe the result belongs to
    /// * `raw` - The result as returned by the service
    ///
    /// # Returns
    /// A copy of the probe with its value set
    pub async fn from_remote_result(
        &self,
        name: &str,
        probe: &ProbeSpec,
        raw: &JsonValue,
    ) -> Result<ProbeSpec, BridgeError> {
        let value = match &probe.kind {
            ValueKind::StructuredFile => {
                let filename = plain_filename(name, probe.filename.as_deref())?;
                let handle = result_handle(name, raw)?;

                let dir = scratch_dir().await?;
                let archive = self.files.download(&handle, dir.path()).await?;
                let entry = filename.to_string();
                let content = blocking(move || read_archive_entry(&archive, &entry))
                    .await?
                    .map_err(|reason| BridgeError::marshal(name, reason))?;

                serde_json::from_str(&content).map_err(|e| {
                    BridgeError::marshal(name, format!("'{}' is not valid JSON: {}", filename, e))
                })?
            }
            ValueKind::OpaqueFile => {
                let handle = result_handle(name, raw)?;
                let filename = plain_filename(name, Some(&handle.filename))?;

                // Re-uploading under the original file name copies the result
                // out of the job's storage scope.
                let dir = scratch_dir().await?;
                let downloaded = self.files.download(&handle, dir.path()).await?;
                let renamed = dir.path().join(filename);
                tokio::fs::rename(&downloaded, &renamed).await?;

                let copy = self.files.upload(&renamed).await?;
                debug!("Copied result '{}' to file {}", name, copy.id);
                let serialized = copy
                    .to_json_string()
                    .map_err(|e| BridgeError::marshal(name, e))?;
                JsonValue::String(serialized)
            }
            ValueKind::Integer => coerce_integer(name, raw)?,
            ValueKind::Float => coerce_float(name, raw)?,
            ValueKind::Scalar(_) => raw.clone(),
            ValueKind::Unsupported(kind) => return Err(unsupported(name, kind)),
        };

        let mut filled = probe.clone();
        filled.value = Some(value);
        Ok(filled)
    }
}

/// Runs file system work off the async workers
async fn blocking<T, F>(work: F) -> Result<T, BridgeError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BridgeError::Io(std::io::Error::other(e.to_string())))
}

/// Temp directory removed when the returned handle is dropped
async fn scratch_dir() -> Result<tempfile::TempDir, BridgeError> {
    Ok(blocking(tempfile::tempdir).await??)
}

fn unsupported(name: &str, kind: &str) -> BridgeError {
    BridgeError::UnsupportedKind {
        name: name.to_string(),
        kind: kind.to_string(),
    }
}

/// The file name of a file-backed value, which must not contain a path
fn plain_filename<'a>(name: &str, filename: Option<&'a str>) -> Result<&'a str, BridgeError> {
    let filename = filename.ok_or_else(|| BridgeError::marshal(name, "missing filename"))?;

    match Path::new(filename).file_name() {
        Some(base) if base == filename => Ok(filename),
        _ => Err(BridgeError::marshal(
            name,
            format!("'{}' is not a plain file name", filename),
        )),
    }
}

fn result_handle(name: &str, raw: &JsonValue) -> Result<FileHandle, BridgeError> {
    FileHandle::from_json(raw)
        .map_err(|e| BridgeError::marshal(name, format!("result is not a file: {}", e)))
}

fn handle_to_value(name: &str, handle: &FileHandle) -> Result<JsonValue, BridgeError> {
    serde_json::to_value(handle).map_err(|e| BridgeError::marshal(name, e))
}

fn read_archive_entry(archive: &Path, entry: &str) -> Result<String, String> {
    let file = std::fs::File::open(archive).map_err(|e| format!("cannot open result: {}", e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("result is not an archive: {}", e))?;
    let mut entry_file = archive
        .by_name(entry)
        .map_err(|e| format!("'{}' not found in result archive: {}", entry, e))?;

    let mut content = String::new();
    entry_file
        .read_to_string(&mut content)
        .map_err(|e| format!("cannot read '{}': {}", entry, e))?;
    Ok(content)
}

fn coerce_integer(name: &str, value: &JsonValue) -> Result<JsonValue, BridgeError> {
    let coerced = match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };

    coerced
        .map(JsonValue::from)
        .ok_or_else(|| BridgeError::marshal(name, format!("{} is not an integer", value)))
}

fn coerce_float(name: &str, value: &JsonValue) -> Result<JsonValue, BridgeError> {
    let coerced = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    coerced
        .and_then(Number::from_f64)
        .map(JsonValue::Number)
        .ok_or_else(|| BridgeError::marshal(name, format!("{} is not a finite float", value)))
}
