//! File storage API endpoints

use crate::ServiceClient;
use crate::error::{ClientError, Result};
use mapbridge_core::domain::file::FileHandle;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

impl ServiceClient {
    // =============================================================================
    // File Storage
    // =============================================================================

    /// Upload a local file to the service
    ///
    /// # Arguments
    /// * `path` - Local file to upload; its file name is kept on the service
    ///
    /// # Returns
    /// A handle that can be passed as a job input
    pub async fn upload_file(&self, path: &Path) -> Result<FileHandle> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::InvalidRequest(format!("Not a file path: {}", path.display()))
            })?
            .to_string();

        let content = tokio::fs::read(path).await?;
        debug!("Uploading {} ({} bytes)", filename, content.len());

        let form = Form::new().part("file", Part::bytes(content).file_name(filename));
        let response = self
            .request(Method::PUT, "/v0/files/content")
            .multipart(form)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Download a file from the service into a local directory
    ///
    /// # Arguments
    /// * `file_id` - The remote file id
    /// * `dest_dir` - Directory the file is written to
    ///
    /// # Returns
    /// Path of the downloaded file (named after the file id)
    pub async fn download_file(&self, file_id: Uuid, dest_dir: &Path) -> Result<PathBuf> {
        let response = self
            .request(Method::GET, &format!("/v0/files/{}/content", file_id))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let bytes = response.bytes().await?;
        let path = dest_dir.join(file_id.to_string());
        tokio::fs::write(&path, &bytes).await?;

        debug!("Downloaded file {} to {}", file_id, path.display());
        Ok(path)
    }
}
