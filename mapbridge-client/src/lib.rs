//! Mapbridge Client
//!
//! Clients shared by the bridge runner and the CLI:
//! - [`ServiceClient`]: a typed HTTP client for the remote job-execution service
//!   (study jobs and file storage)
//! - [`MailboxClient`]: the producer side of the file mailbox, used by drivers
//!   to submit batches and wait for their results
//!
//! # Example
//!
//! ```no_run
//! use mapbridge_client::ServiceClient;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ServiceClient::new("http://localhost:8006")
//!         .with_credentials("key", "secret");
//!
//!     let status = client
//!         .inspect_study_job(Uuid::new_v4(), Uuid::new_v4())
//!         .await?;
//!
//!     println!("Job is {}", status.state);
//!     Ok(())
//! }
//! ```

pub mod error;
mod files;
pub mod mailbox;
mod studies;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use mailbox::{MailboxClient, TaskTemplate};

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

/// API key pair used for basic authentication against the service
#[derive(Debug, Clone)]
struct Credentials {
    key: String,
    secret: String,
}

/// HTTP client for the remote job-execution service
///
/// The client is stateless apart from its connection pool and is meant to be
/// shared (behind an `Arc`) by every worker of the bridge.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    /// Base URL of the service (e.g., "http://localhost:8006")
    base_url: String,
    /// HTTP client instance
    client: Client,
    credentials: Option<Credentials>,
}

impl ServiceClient {
    /// Create a new service client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the service API (e.g., "http://localhost:8006")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new service client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials: None,
        }
    }

    /// Authenticate every request with the given API key and secret
    pub fn with_credentials(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            key: key.into(),
            secret: secret.into(),
        });
        self
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry credentials
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Start a request against a path relative to the base URL
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);

        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.key, Some(&creds.secret)),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ServiceClient::new("http://localhost:8006");
        assert_eq!(client.base_url(), "http://localhost:8006");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ServiceClient::new("http://localhost:8006/");
        assert_eq!(client.base_url(), "http://localhost:8006");
    }

    #[test]
    fn test_client_with_credentials() {
        let client = ServiceClient::with_client("http://localhost:8006", Client::new())
            .with_credentials("key", "secret");
        assert!(client.is_authenticated());
    }

    #[test]
    fn test_request_targets_base_url() {
        let client = ServiceClient::new("http://localhost:8006/");
        let request = client
            .request(Method::GET, "/v0/files/abc/content")
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8006/v0/files/abc/content"
        );
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_request_carries_basic_auth() {
        let client = ServiceClient::new("http://localhost:8006").with_credentials("key", "secret");
        let request = client.request(Method::POST, "/v0/studies").build().unwrap();
        let auth = request.headers().get("authorization").unwrap();
        assert!(auth.to_str().unwrap().starts_with("Basic "));
    }
}
