//! Configuration module
//!
//! Handles CLI configuration: mailbox locations and the remote service
//! connection.

use mapbridge_client::{MailboxClient, ServiceClient};
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the bridge reads its inbox from
    pub inbox_dir: PathBuf,

    /// Directory the bridge writes its outbox to
    pub outbox_dir: PathBuf,

    /// URL of the remote job-execution service
    pub api_url: String,

    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl Config {
    /// Producer side of the bridge's mailbox
    pub fn mailbox(&self) -> MailboxClient {
        MailboxClient::new(&self.inbox_dir, &self.outbox_dir)
    }

    /// Client for the remote service, authenticated when credentials are set
    pub fn service_client(&self) -> ServiceClient {
        let client = ServiceClient::new(self.api_url.clone());
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => client.with_credentials(key.clone(), secret.clone()),
            _ => client,
        }
    }
}
