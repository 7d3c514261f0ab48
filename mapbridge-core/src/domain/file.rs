//! Remote file domain types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Handle to a file stored on the remote execution service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub id: Uuid,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub e_tag: Option<String>,
}

impl FileHandle {
    /// Rebuilds a handle from a JSON value
    ///
    /// Accepts both an embedded object and a string holding the serialized
    /// object, which is how handles travel inside task documents.
    pub fn from_json(value: &JsonValue) -> Result<Self, serde_json::Error> {
        match value {
            JsonValue::String(raw) => serde_json::from_str(raw),
            other => serde_json::from_value(other.clone()),
        }
    }

    /// Serializes the handle into the string form stored in task documents
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
