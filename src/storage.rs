//! Blob storage writers
//!
//! The pipeline only needs a durable put-by-path operation. `GcsBlobStore`
//! talks to Google Cloud Storage over the JSON API, `FsBlobStore` mirrors
//! the blob layout under a local directory, and `MemoryBlobStore` keeps
//! blobs in a shared map for tests and dry runs.
//!
//! Writes to the same path overwrite; re-running a window never creates
//! duplicates.

use crate::error::{IngestError, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const GCS_UPLOAD_BASE_URL: &str = "https://storage.googleapis.com/upload/storage/v1";

/// Trait for blob stores
///
/// Implementations must be safe for concurrent independent calls.
pub trait BlobStore: Send + Sync {
    /// Durably persist `payload` under `path`, overwriting any existing blob
    fn put(&self, path: &str, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

/// Google Cloud Storage writer (JSON API media upload)
pub struct GcsBlobStore {
    client: Client,
    bucket: String,
    token: String,
}

impl GcsBlobStore {
    /// Create a writer for `bucket` authenticated with a bearer token
    pub fn new(bucket: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IngestError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            bucket,
            token,
        })
    }
}

impl BlobStore for GcsBlobStore {
    async fn put(&self, path: &str, payload: Vec<u8>) -> Result<()> {
        let url = format!("{}/b/{}/o", GCS_UPLOAD_BASE_URL, self.bucket);

        // The object name rides in the query string so reqwest
        // percent-encodes the slashes in the blob path.
        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", path)])
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await
            .map_err(|e| IngestError::Storage {
                path: path.to_string(),
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Storage {
                path: path.to_string(),
                reason: format!("bucket {} returned {}: {}", self.bucket, status, body),
            });
        }

        Ok(())
    }
}

/// Local filesystem writer, mirroring the blob layout under a root directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, payload: Vec<u8>) -> Result<()> {
        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, payload).await?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a stored blob by path
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().unwrap().get(path).cloned()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.read().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, payload: Vec<u8>) -> Result<()> {
        self.blobs.write().unwrap().insert(path.to_string(), payload);
        Ok(())
    }
}
