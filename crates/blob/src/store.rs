// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Catalog Vault.
//
// Catalog Vault is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Catalog Vault is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Catalog Vault. If not, see <https://www.gnu.org/licenses/>.

//! Blob store client.
//!
//! ## Design
//! - **Thin**: four operations (`put`, `get`, `delete`, `list_by_prefix`), no caching
//! - **Bucket-relative paths**: callers never see backend-specific locations
//! - **Cache busting**: `put` returns the public URL with a `?v={millis}` suffix,
//!   because images are rewritten in place under the same path
//! - **Idempotent delete**: deleting a missing blob succeeds
//!
//! Whether a failure is fatal is the caller's decision: garbage collection
//! logs and continues, primary writes propagate.

use crate::{BlobConfig, BlobError, BlobPathCodec, BlobResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use object_store::{
    memory::InMemory, path::Path as ObjectPath, Attribute, AttributeValue, Attributes,
    ObjectStore, PutOptions, PutPayload,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace};

/// Blob store operations used by the persistence layer.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` at `path` and return its public URL (with cache-busting token).
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> BlobResult<String>;

    /// Read the blob at `path`.
    ///
    /// ## Returns
    /// - `Ok(Some(bytes))` if the blob exists
    /// - `Ok(None)` if it does not
    async fn get(&self, path: &str) -> BlobResult<Option<Vec<u8>>>;

    /// Delete the blob at `path`. Succeeds if it does not exist.
    async fn delete(&self, path: &str) -> BlobResult<()>;

    /// List paths under `prefix`, sorted.
    async fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>>;

    /// Codec bound to this store's bucket.
    fn codec(&self) -> &BlobPathCodec;
}

/// Blob store backed by the `object_store` crate.
///
/// ## Example
/// ```rust
/// use catalogvault_blob::{BlobStore, ObjectStoreBlobStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ObjectStoreBlobStore::in_memory("catalog-bucket");
/// let url = store.put("projects/p1/images/a.png", vec![1, 2, 3], "image/png").await?;
/// assert!(url.starts_with("https://"));
/// assert_eq!(store.get("projects/p1/images/a.png").await?, Some(vec![1, 2, 3]));
/// # Ok(())
/// # }
/// ```
pub struct ObjectStoreBlobStore {
    object_store: Arc<dyn ObjectStore>,
    config: BlobConfig,
    codec: BlobPathCodec,
}

impl ObjectStoreBlobStore {
    /// Create a new blob store from config.
    pub async fn new(config: BlobConfig) -> BlobResult<Self> {
        let object_store = config.build_object_store().await?;
        Ok(Self::with_object_store(config, object_store))
    }

    /// Create from environment variables.
    pub async fn from_env() -> BlobResult<Self> {
        Self::new(BlobConfig::from_env()).await
    }

    /// Create with custom object store (for testing).
    pub fn with_object_store(config: BlobConfig, object_store: Arc<dyn ObjectStore>) -> Self {
        let codec = config.codec();
        Self {
            object_store,
            config,
            codec,
        }
    }

    /// In-memory store for `bucket`.
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self::with_object_store(BlobConfig::memory(bucket), Arc::new(InMemory::new()))
    }

    /// Underlying object store.
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.object_store)
    }

    fn object_path(path: &str) -> BlobResult<ObjectPath> {
        if path.trim_matches('/').is_empty() {
            return Err(BlobError::InvalidPath("path cannot be empty".to_string()));
        }
        Ok(ObjectPath::parse(path)?)
    }

    fn versioned_url(&self, path: &str) -> String {
        format!("{}?v={}", self.codec.to_url(path), Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    #[instrument(skip(self, data), fields(bucket = %self.config.bucket, path = %path, size = data.len()))]
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> BlobResult<String> {
        let start = Instant::now();
        trace!("Putting blob to object store");
        let location = Self::object_path(path)?;
        let payload = PutPayload::from(Bytes::from(data));

        let result = if self.config.supports_attributes() && !content_type.is_empty() {
            let mut attributes = Attributes::new();
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_string()),
            );
            let options = PutOptions {
                attributes,
                ..Default::default()
            };
            self.object_store.put_opts(&location, payload, options).await
        } else {
            self.object_store.put(&location, payload).await
        };

        result.map_err(|e| {
            error!(error = %e, "Failed to put blob");
            BlobError::StorageError(format!("Failed to upload {}: {}", path, e))
        })?;

        info!(
            duration_ms = start.elapsed().as_millis(),
            content_type = %content_type,
            "Blob stored successfully"
        );
        Ok(self.versioned_url(path))
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket, path = %path))]
    async fn get(&self, path: &str) -> BlobResult<Option<Vec<u8>>> {
        let start = Instant::now();
        let location = Self::object_path(path)?;

        match self.object_store.get(&location).await {
            Ok(result) => {
                let bytes = result.bytes().await.map_err(|e| {
                    error!(error = %e, "Failed to read blob bytes");
                    BlobError::StorageError(format!("Failed to read {}: {}", path, e))
                })?;
                debug!(
                    duration_ms = start.elapsed().as_millis(),
                    size_bytes = bytes.len(),
                    "Blob retrieved successfully"
                );
                Ok(Some(bytes.to_vec()))
            }
            Err(object_store::Error::NotFound { .. }) => {
                debug!(duration_ms = start.elapsed().as_millis(), "Blob not found");
                Ok(None)
            }
            Err(e) => {
                error!(error = %e, "Failed to get blob");
                Err(BlobError::StorageError(format!("Failed to download {}: {}", path, e)))
            }
        }
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket, path = %path))]
    async fn delete(&self, path: &str) -> BlobResult<()> {
        let start = Instant::now();
        let location = Self::object_path(path)?;

        match self.object_store.delete(&location).await {
            Ok(()) => {
                info!(duration_ms = start.elapsed().as_millis(), "Blob deleted successfully");
                Ok(())
            }
            Err(object_store::Error::NotFound { .. }) => {
                debug!(
                    duration_ms = start.elapsed().as_millis(),
                    "Blob not found (idempotent delete)"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to delete blob");
                Err(BlobError::StorageError(format!("Failed to delete {}: {}", path, e)))
            }
        }
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket, prefix = %prefix))]
    async fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let start = Instant::now();
        let location = if prefix.trim_matches('/').is_empty() {
            None
        } else {
            Some(ObjectPath::parse(prefix)?)
        };

        let mut stream = self.object_store.list(location.as_ref());
        let mut paths = Vec::new();
        while let Some(result) = stream.next().await {
            match result {
                Ok(meta) => paths.push(meta.location.to_string()),
                Err(e) => {
                    error!(error = %e, "Failed to list blobs");
                    return Err(BlobError::StorageError(format!(
                        "Failed to list {}: {}",
                        prefix, e
                    )));
                }
            }
        }

        paths.sort();
        debug!(
            duration_ms = start.elapsed().as_millis(),
            count = paths.len(),
            "Listed blobs successfully"
        );
        Ok(paths)
    }

    fn codec(&self) -> &BlobPathCodec {
        &self.codec
    }
}
