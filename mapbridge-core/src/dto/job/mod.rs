//! Remote job DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use uuid::Uuid;

/// Body of a create-job request: marshaled inputs keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInputs {
    pub values: Map<String, JsonValue>,
}

/// Results of a finished job keyed by probe name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutputs {
    pub job_id: Uuid,
    #[serde(default)]
    pub results: HashMap<String, JsonValue>,
}
