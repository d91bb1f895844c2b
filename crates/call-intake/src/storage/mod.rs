//! Archive of raw submissions, one JSON object per request id.

mod gcs;
mod local;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::StorageConfig;
use crate::submission::RequestId;

pub use gcs::GcsStore;
pub use local::LocalDirStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize submission: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("storage responded with status {status} for {key}: {body}")]
    Status {
        key: String,
        status: u16,
        body: String,
    },
    #[error("storage io failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("object {0} not found")]
    NotFound(String),
    #[error("storage credentials unavailable: {0}")]
    Credentials(String),
    #[error("invalid storage url {0}")]
    InvalidUrl(String),
}

/// Object storage holding archived submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::NotFound`] when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Serializes the raw body the way it is persisted, indented by two spaces.
pub fn archive_bytes(raw: &Value) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(raw)?)
}

/// Writes `bytes` under `<request id>.json`.
pub async fn archive(
    store: &dyn SubmissionStore,
    request_id: &RequestId,
    bytes: Vec<u8>,
) -> Result<(), StoreError> {
    store.put(&request_id.archive_key(), bytes).await
}

/// Loads the archived body for `request_id`, `None` when it was never stored.
pub async fn load(
    store: &dyn SubmissionStore,
    request_id: &RequestId,
) -> Result<Option<Value>, StoreError> {
    let key = request_id.archive_key();
    if !store.exists(&key).await? {
        return Ok(None);
    }
    let bytes = store.get(&key).await?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

pub fn store_from_config(config: &StorageConfig) -> Result<Arc<dyn SubmissionStore>, StoreError> {
    Ok(match config {
        StorageConfig::Bucket { bucket } => Arc::new(GcsStore::new(bucket.clone())?),
        StorageConfig::LocalDir { root } => Arc::new(LocalDirStore::new(root.clone())),
    })
}
