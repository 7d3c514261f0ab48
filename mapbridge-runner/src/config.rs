//! Runner configuration
//!
//! Defines all configurable parameters for the bridge including mailbox
//! locations, the remote service connection, worker budget and polling
//! intervals.

use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::error::BridgeError;

/// Runner configuration
///
/// All intervals are configurable to allow tuning for different deployment
/// scenarios (local tests vs a busy remote service).
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the inbox document is read from
    pub input_dir: PathBuf,

    /// Directory the outbox document is written to
    pub output_dir: PathBuf,

    /// Study template every remote job is created from
    pub template_id: Uuid,

    /// Remote service base URL (e.g., "http://localhost:8006")
    pub api_url: String,

    /// API key for basic authentication
    pub api_key: Option<String>,

    /// API secret for basic authentication
    pub api_secret: Option<String>,

    /// Max remote jobs running at once for one batch
    pub workers: usize,

    /// How often the bridge checks the inbox
    pub poll_interval: Duration,

    /// How often a worker checks the state of its remote job
    pub job_poll_interval: Duration,

    /// Give up on a remote job after this long (no limit when unset)
    pub job_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(template_id: Uuid) -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            template_id,
            api_url: "http://localhost:8006".to_string(),
            api_key: None,
            api_secret: None,
            workers: 1,
            poll_interval: Duration::from_secs(1),
            job_poll_interval: Duration::from_secs(1),
            job_timeout: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - MAPBRIDGE_TEMPLATE_ID (required)
    /// - MAPBRIDGE_INPUT_DIR (optional, default: .)
    /// - MAPBRIDGE_OUTPUT_DIR (optional, default: .)
    /// - MAPBRIDGE_API_URL (optional, default: http://localhost:8006)
    /// - OSPARC_API_KEY / OSPARC_API_SECRET (optional)
    /// - MAPBRIDGE_WORKERS (optional, default: 1)
    /// - MAPBRIDGE_POLL_INTERVAL_MS (optional, default: 1000)
    /// - MAPBRIDGE_JOB_POLL_INTERVAL_MS (optional, default: 1000)
    /// - MAPBRIDGE_JOB_TIMEOUT_SECS (optional, default: no timeout)
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable lookup
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        let raw_template = var("MAPBRIDGE_TEMPLATE_ID").ok_or_else(|| {
            BridgeError::Configuration(
                "MAPBRIDGE_TEMPLATE_ID environment variable not set".to_string(),
            )
        })?;
        let template_id = Uuid::parse_str(raw_template.trim()).map_err(|e| {
            BridgeError::Configuration(format!(
                "MAPBRIDGE_TEMPLATE_ID is not a valid id ({}): {}",
                raw_template, e
            ))
        })?;

        let mut config = Self::new(template_id);

        if let Some(dir) = var("MAPBRIDGE_INPUT_DIR") {
            config.input_dir = PathBuf::from(dir);
        }

        if let Some(dir) = var("MAPBRIDGE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        if let Some(url) = var("MAPBRIDGE_API_URL") {
            config.api_url = url;
        }

        config.api_key = var("OSPARC_API_KEY");
        config.api_secret = var("OSPARC_API_SECRET");

        if let Some(workers) = var("MAPBRIDGE_WORKERS").and_then(|s| s.parse::<usize>().ok()) {
            config.workers = workers;
        }

        if let Some(interval) = var("MAPBRIDGE_POLL_INTERVAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
        {
            config.poll_interval = interval;
        }

        if let Some(interval) = var("MAPBRIDGE_JOB_POLL_INTERVAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
        {
            config.job_poll_interval = interval;
        }

        config.job_timeout = var("MAPBRIDGE_JOB_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), BridgeError> {
        let invalid =
            |msg: &str| -> Result<(), BridgeError> { Err(BridgeError::Configuration(msg.to_string())) };

        if self.template_id.is_nil() {
            return invalid("template_id cannot be nil");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return invalid("api_url must start with http:// or https://");
        }

        if self.api_key.is_some() != self.api_secret.is_some() {
            return invalid("api_key and api_secret must be set together");
        }

        if self.workers == 0 {
            return invalid("workers must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            return invalid("poll_interval must be greater than 0");
        }

        if self.job_poll_interval.is_zero() {
            return invalid("job_poll_interval must be greater than 0");
        }

        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            return invalid("job_timeout must be greater than 0");
        }

        Ok(())
    }
}
