//! Files repository
//!
//! Moves files between the local disk and the remote file storage.

use async_trait::async_trait;
use mapbridge_client::{Result, ServiceClient};
use mapbridge_core::domain::file::FileHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Repository trait for remote file storage
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Uploads a local file, keeping its file name
    async fn upload(&self, path: &Path) -> Result<FileHandle>;

    /// Downloads a remote file into `dest_dir`
    ///
    /// # Returns
    /// Path of the local copy
    async fn download(&self, file: &FileHandle, dest_dir: &Path) -> Result<PathBuf>;
}

/// HTTP implementation of FileRepository
pub struct HttpFileRepository {
    client: Arc<ServiceClient>,
}

impl HttpFileRepository {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileRepository for HttpFileRepository {
    async fn upload(&self, path: &Path) -> Result<FileHandle> {
        self.client.upload_file(path).await
    }

    async fn download(&self, file: &FileHandle, dest_dir: &Path) -> Result<PathBuf> {
        self.client.download_file(file.id, dest_dir).await
    }
}
