//! Task domain types
//!
//! A task maps named parameters to named probes and is executed as one
//! remote job. Tasks arrive through the inbox and leave through the outbox
//! with their probe values filled in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// How a parameter or probe value is carried to and from the remote service
///
/// Serialized as the `type` tag of a parameter/probe:
/// `"FileJSON"`, `"file"`, `"integer"`, `"float"`, anything else is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueKind {
    /// JSON document shipped as an uploaded file
    StructuredFile,
    /// Reference to a file already stored on the remote service
    OpaqueFile,
    Integer,
    Float,
    /// Passed through unchanged, keeps its original tag
    Scalar(String),
    /// A file flavour the bridge does not know how to marshal
    Unsupported(String),
}

impl ValueKind {
    /// The wire tag for this kind
    pub fn tag(&self) -> &str {
        match self {
            ValueKind::StructuredFile => "FileJSON",
            ValueKind::OpaqueFile => "file",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Scalar(tag) | ValueKind::Unsupported(tag) => tag,
        }
    }
}

impl Default for ValueKind {
    fn default() -> Self {
        ValueKind::Scalar("scalar".to_string())
    }
}

impl From<String> for ValueKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "FileJSON" => ValueKind::StructuredFile,
            "file" => ValueKind::OpaqueFile,
            "integer" => ValueKind::Integer,
            "float" => ValueKind::Float,
            _ if tag.starts_with("File") => ValueKind::Unsupported(tag),
            _ => ValueKind::Scalar(tag),
        }
    }
}

impl From<ValueKind> for String {
    fn from(kind: ValueKind) -> Self {
        kind.tag().to_string()
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Typed description of one job input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type", default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ParamSpec {
    pub fn new(kind: ValueKind, value: JsonValue) -> Self {
        Self {
            kind,
            value,
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Typed description of one expected job output
///
/// `value` stays unset until the job that produces it succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSpec {
    #[serde(rename = "type", default)]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

impl ProbeSpec {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            filename: None,
            value: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Task execution status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Success => write!(f, "SUCCESS"),
            TaskStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One unit of work: named parameters in, named probes out
///
/// Fields the bridge does not know about are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub input: HashMap<String, ParamSpec>,
    #[serde(default)]
    pub output: HashMap<String, ProbeSpec>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Diagnostic text for a failed task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Task {
    /// Marks the task as failed and clears every probe value
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(reason.into());
        for probe in self.output.values_mut() {
            probe.value = None;
        }
    }

    /// Probe values keyed by probe name, skipping unset probes
    pub fn output_values(&self) -> HashMap<String, JsonValue> {
        self.output
            .iter()
            .filter_map(|(name, probe)| probe.value.clone().map(|v| (name.clone(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_kind_tags() {
        assert_eq!(ValueKind::from("FileJSON".to_string()), ValueKind::StructuredFile);
        assert_eq!(ValueKind::from("file".to_string()), ValueKind::OpaqueFile);
        assert_eq!(ValueKind::from("integer".to_string()), ValueKind::Integer);
        assert_eq!(ValueKind::from("float".to_string()), ValueKind::Float);
        assert_eq!(
            ValueKind::from("number".to_string()),
            ValueKind::Scalar("number".to_string())
        );
        assert_eq!(
            ValueKind::from("FileCSV".to_string()),
            ValueKind::Unsupported("FileCSV".to_string())
        );
    }

    #[test]
    fn test_task_from_inbox_json() {
        let task: Task = serde_json::from_value(json!({
            "input": {
                "x": {"type": "float", "value": "2.5"},
                "conf": {"type": "FileJSON", "value": {"a": 1}, "filename": "x.json"}
            },
            "output": {
                "y": {"type": "FileJSON", "filename": "y.json"}
            },
            "label": "first"
        }))
        .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.input["x"].kind, ValueKind::Float);
        assert_eq!(task.input["conf"].filename.as_deref(), Some("x.json"));
        assert!(task.output["y"].value.is_none());
        assert_eq!(task.extra.get("label"), Some(&json!("first")));
    }

    #[test]
    fn test_task_serialization_keeps_tags_and_extra_fields() {
        let mut task = Task::default();
        task.input.insert(
            "n".to_string(),
            ParamSpec::new(ValueKind::Scalar("number".to_string()), json!(4)),
        );
        task.extra.insert("label".to_string(), json!("kept"));

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["input"]["n"]["type"], json!("number"));
        assert_eq!(value["status"], json!("PENDING"));
        assert_eq!(value["label"], json!("kept"));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_fail_clears_probe_values() {
        let mut task = Task::default();
        let mut probe = ProbeSpec::new(ValueKind::Float);
        probe.value = Some(json!(1.0));
        task.output.insert("y".to_string(), probe);

        task.fail("remote job failed");

        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("remote job failed"));
        assert!(task.output["y"].value.is_none());
        assert!(task.output_values().is_empty());
    }
}
