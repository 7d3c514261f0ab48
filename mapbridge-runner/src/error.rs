//! Error types for the bridge

use mapbridge_client::ClientError;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while bridging tasks to the remote service
///
/// A remote job ending in `FAILED` is not an error: the task is marked as
/// failed and the batch goes on.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Unknown command or unusable configuration, stops the bridge
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote job returned a probe the task does not declare
    #[error("Unknown probe in output: {0}")]
    UnknownProbe(String),

    /// A value could not be converted to or from its remote form
    #[error("Failed to marshal '{name}': {reason}")]
    Marshal { name: String, reason: String },

    /// A parameter or probe declares a type the bridge cannot handle
    #[error("Unsupported type '{kind}' for '{name}'")]
    UnsupportedKind { name: String, kind: String },

    #[error("Remote job {job_id} did not finish within {timeout:?}")]
    JobTimeout { job_id: Uuid, timeout: Duration },

    #[error("Cancelled before the remote job finished")]
    Cancelled,

    /// The inbox holds something that is not a valid document
    #[error("Malformed inbox document: {0}")]
    MalformedInbox(#[source] serde_json::Error),

    #[error("Remote service error: {0}")]
    Remote(#[from] ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn marshal(name: &str, reason: impl std::fmt::Display) -> Self {
        Self::Marshal {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
