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

//! Configuration support for document store backends.
//!
//! ## Environment Variables
//! - `CATALOGVAULT_DOC_BACKEND`: `memory` (default) | `blob`
//! - `CATALOGVAULT_DOC_PREFIX`: object prefix for the `blob` backend (default: `catalogvault`)
//! - `CATALOGVAULT_DOC_MAX_BYTES`: document size limit (default: 1048576)
//!
//! The `blob` backend reuses the blob store variables (`CATALOGVAULT_BLOB_*`),
//! see `catalogvault_blob::BlobConfig`.

use crate::{
    DocumentError, DocumentResult, DocumentStore, InMemoryDocumentStore, ObjectStoreDocumentStore,
    DEFAULT_MAX_DOCUMENT_BYTES,
};
use catalogvault_blob::BlobConfig;
use std::sync::Arc;

/// Backend type configuration.
#[derive(Debug, Clone, Default)]
pub enum DocumentBackend {
    /// In-memory backend (default, always available)
    #[default]
    InMemory,
    /// JSON documents in an object store
    Blob {
        /// Object store configuration
        config: BlobConfig,
        /// Object prefix under which `documents/` lives
        prefix: String,
    },
}

/// Document store configuration.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Backend type
    pub backend: DocumentBackend,
    /// Maximum encoded document size in bytes
    pub max_document_bytes: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            backend: DocumentBackend::InMemory,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl DocumentConfig {
    /// Create configuration with explicit backend.
    pub fn new(backend: DocumentBackend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> DocumentResult<Self> {
        let backend_str = std::env::var("CATALOGVAULT_DOC_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase();

        let backend = match backend_str.as_str() {
            "memory" | "in-memory" => DocumentBackend::InMemory,
            "blob" => DocumentBackend::Blob {
                config: BlobConfig::from_env(),
                prefix: std::env::var("CATALOGVAULT_DOC_PREFIX")
                    .unwrap_or_else(|_| "catalogvault".to_string()),
            },
            other => {
                return Err(DocumentError::ConfigError(format!(
                    "Unknown document backend: {}. Valid options: memory, blob",
                    other
                )));
            }
        };

        let max_document_bytes = match std::env::var("CATALOGVAULT_DOC_MAX_BYTES") {
            Ok(raw) => raw.parse().map_err(|_| {
                DocumentError::ConfigError(format!(
                    "CATALOGVAULT_DOC_MAX_BYTES must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_MAX_DOCUMENT_BYTES,
        };

        Ok(Self {
            backend,
            max_document_bytes,
        })
    }
}

/// Create a document store from explicit configuration.
///
/// ## Examples
/// ```rust
/// use catalogvault_document::{create_document_store_from_config, DocumentConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = create_document_store_from_config(&DocumentConfig::default()).await?;
/// assert!(store.list("projects").await?.is_empty());
/// # Ok(())
/// # }
/// ```
pub async fn create_document_store_from_config(
    config: &DocumentConfig,
) -> DocumentResult<Arc<dyn DocumentStore>> {
    match &config.backend {
        DocumentBackend::InMemory => Ok(Arc::new(InMemoryDocumentStore::with_max_document_bytes(
            config.max_document_bytes,
        ))),
        DocumentBackend::Blob { config: blob, prefix } => {
            let store = ObjectStoreDocumentStore::new(blob, prefix.clone())
                .await?
                .with_max_document_bytes(config.max_document_bytes);
            Ok(Arc::new(store))
        }
    }
}
