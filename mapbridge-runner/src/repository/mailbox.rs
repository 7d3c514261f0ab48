//! Mailbox repository
//!
//! The bridge is the only reader of the inbox and the only writer of the
//! outbox. Outbox writes replace the whole file at once.

use async_trait::async_trait;
use mapbridge_client::mailbox::write_atomically;
use mapbridge_core::dto::mailbox::{INBOX_FILE_NAME, InboxDocument, OUTBOX_FILE_NAME, OutboxDocument};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::error::BridgeError;

/// Repository trait for the inbox/outbox pair
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Reads the inbox document
    ///
    /// # Returns
    /// `None` while there is no inbox yet
    async fn try_get_inbox(&self) -> Result<Option<InboxDocument>, BridgeError>;

    /// Replaces the outbox document
    async fn put_outbox(&self, doc: &OutboxDocument) -> Result<(), BridgeError>;
}

/// Mailbox backed by two JSON files
pub struct FileMailbox {
    inbox_path: PathBuf,
    outbox_path: PathBuf,
}

impl FileMailbox {
    /// Creates a mailbox reading from `input_dir` and writing to `output_dir`
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inbox_path: input_dir.into().join(INBOX_FILE_NAME),
            outbox_path: output_dir.into().join(OUTBOX_FILE_NAME),
        }
    }

    pub fn inbox_path(&self) -> &PathBuf {
        &self.inbox_path
    }

    pub fn outbox_path(&self) -> &PathBuf {
        &self.outbox_path
    }

    /// Removes an outbox left over from a previous run
    pub async fn clear_outbox(&self) -> Result<(), BridgeError> {
        match tokio::fs::remove_file(&self.outbox_path).await {
            Ok(()) => {
                debug!("Removed stale outbox {}", self.outbox_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Mailbox for FileMailbox {
    async fn try_get_inbox(&self) -> Result<Option<InboxDocument>, BridgeError> {
        let content = match tokio::fs::read(&self.inbox_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(BridgeError::MalformedInbox)
    }

    async fn put_outbox(&self, doc: &OutboxDocument) -> Result<(), BridgeError> {
        let content = serde_json::to_vec_pretty(doc)
            .map_err(|e| BridgeError::marshal("outbox", e))?;
        let path = self.outbox_path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;

        debug!("Wrote outbox for batch {}", doc.uuid);
        Ok(())
    }
}
