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

//! Blob backend configuration.
//!
//! ## Environment Variables
//! - `CATALOGVAULT_BLOB_BACKEND`: `memory` (default) | `local` | `gcp` | `s3` | `minio`
//! - `CATALOGVAULT_BLOB_BUCKET`: bucket name (default: `catalogvault`)
//! - `CATALOGVAULT_BLOB_ROOT`: root directory for the `local` backend
//! - `CATALOGVAULT_BLOB_PUBLIC_HOST`: host used in public URLs
//!   (default: `storage.googleapis.com`)
//! - `CATALOGVAULT_BLOB_ENDPOINT`: endpoint URL (MinIO)
//! - `CATALOGVAULT_BLOB_REGION`: region (S3)
//! - `CATALOGVAULT_BLOB_USE_SSL`: `true`/`false` (MinIO)
//! - `GOOGLE_SERVICE_ACCOUNT_PATH`: service account JSON (GCP)
//! - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`: credentials (S3, MinIO)

use crate::codec::{BlobPathCodec, DEFAULT_PUBLIC_HOST};
use crate::{BlobError, BlobResult};
use object_store::{
    aws::AmazonS3Builder, gcp::GoogleCloudStorageBuilder, local::LocalFileSystem,
    memory::InMemory, ObjectStore,
};
use std::sync::Arc;
use tracing::info;

/// Configuration for the blob store backend
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Backend type (memory, local, gcp, s3, minio)
    pub backend: String,
    /// Bucket name
    pub bucket: String,
    /// Root directory (local backend only)
    pub root: Option<String>,
    /// Host used when building public URLs
    pub public_host: String,
    /// Endpoint URL (for MinIO)
    pub endpoint: Option<String>,
    /// Region (for S3)
    pub region: Option<String>,
    /// Access key ID
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Use SSL (MinIO)
    pub use_ssl: bool,
    /// GCP service account JSON path
    pub gcp_service_account_path: Option<String>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            bucket: "catalogvault".to_string(),
            root: None,
            public_host: DEFAULT_PUBLIC_HOST.to_string(),
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            use_ssl: false,
            gcp_service_account_path: None,
        }
    }
}

impl BlobConfig {
    /// In-memory backend for `bucket` (tests, smoke runs).
    pub fn memory(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Local filesystem backend rooted at `root`.
    pub fn local(bucket: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            backend: "local".to_string(),
            bucket: bucket.into(),
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        use std::env;
        let defaults = Self::default();
        Self {
            backend: env::var("CATALOGVAULT_BLOB_BACKEND")
                .map(|b| b.to_lowercase())
                .unwrap_or(defaults.backend),
            bucket: env::var("CATALOGVAULT_BLOB_BUCKET").unwrap_or(defaults.bucket),
            root: env::var("CATALOGVAULT_BLOB_ROOT").ok(),
            public_host: env::var("CATALOGVAULT_BLOB_PUBLIC_HOST")
                .unwrap_or(defaults.public_host),
            endpoint: env::var("CATALOGVAULT_BLOB_ENDPOINT").ok(),
            region: env::var("CATALOGVAULT_BLOB_REGION").ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            use_ssl: env::var("CATALOGVAULT_BLOB_USE_SSL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            gcp_service_account_path: env::var("GOOGLE_SERVICE_ACCOUNT_PATH").ok(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> BlobResult<()> {
        if self.bucket.is_empty() {
            return Err(BlobError::ConfigError("bucket is required".to_string()));
        }
        if self.public_host.is_empty() {
            return Err(BlobError::ConfigError("public_host is required".to_string()));
        }
        if self.backend == "minio" && self.endpoint.is_none() {
            return Err(BlobError::ConfigError("endpoint required for MinIO".to_string()));
        }
        Ok(())
    }

    /// Codec for this bucket and public host.
    pub fn codec(&self) -> BlobPathCodec {
        BlobPathCodec::new(self.bucket.clone()).with_public_host(self.public_host.clone())
    }

    /// Whether the backend accepts object attributes such as content type.
    ///
    /// `LocalFileSystem` rejects attributes with `NotImplemented`.
    pub fn supports_attributes(&self) -> bool {
        self.backend != "local"
    }

    /// Build object store from config
    pub async fn build_object_store(&self) -> BlobResult<Arc<dyn ObjectStore>> {
        self.validate()?;

        let store: Arc<dyn ObjectStore> = match self.backend.as_str() {
            "memory" | "in-memory" => Arc::new(InMemory::new()),
            "local" => {
                let root = self.root.as_ref().ok_or_else(|| {
                    BlobError::ConfigError("root required for local backend".to_string())
                })?;
                tokio::fs::create_dir_all(root).await?;
                Arc::new(LocalFileSystem::new_with_prefix(root).map_err(|e| {
                    BlobError::ConfigError(format!(
                        "Failed to create local filesystem store: {}",
                        e
                    ))
                })?)
            }
            "gcp" => {
                let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(&self.bucket);

                if let Some(ref service_account) = self.gcp_service_account_path {
                    builder = builder.with_service_account_path(service_account);
                }

                Arc::new(builder.build().map_err(|e| {
                    BlobError::ConfigError(format!("Failed to build GCP store: {}", e))
                })?)
            }
            "s3" | "minio" => {
                let mut builder = AmazonS3Builder::new().with_bucket_name(&self.bucket);

                if let Some(ref endpoint) = self.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(!self.use_ssl);
                }

                if let Some(ref region) = self.region {
                    builder = builder.with_region(region);
                }

                if let Some(ref access_key_id) = self.access_key_id {
                    builder = builder.with_access_key_id(access_key_id);
                }

                if let Some(ref secret_access_key) = self.secret_access_key {
                    builder = builder.with_secret_access_key(secret_access_key);
                }

                Arc::new(builder.build().map_err(|e| {
                    BlobError::ConfigError(format!("Failed to build S3 store: {}", e))
                })?)
            }
            other => {
                return Err(BlobError::ConfigError(format!(
                    "Unsupported backend: {} (expected memory, local, gcp, s3 or minio)",
                    other
                )));
            }
        };

        info!(backend = %self.backend, bucket = %self.bucket, "Blob object store ready");
        Ok(store)
    }
}
