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

//! Document store backed by an object store.
//!
//! ## Design
//! - **Direct Object Store**: uses the `object_store` crate, no database needed
//! - **Path Structure**: `{prefix}/documents/{collection}/{id}.json`
//! - **Size Limit**: enforced before upload, same as the in-memory store
//!
//! ## Limitations
//! - `list` downloads every document in the collection (one GET per document)
//! - No transactions; a `set` is a single object PUT

use crate::{
    encode_document, validate_key, DocumentError, DocumentResult, DocumentStore,
    DEFAULT_MAX_DOCUMENT_BYTES,
};
use async_trait::async_trait;
use bytes::Bytes;
use catalogvault_blob::BlobConfig;
use futures::StreamExt;
use object_store::{path::Path as ObjectPath, ObjectStore, PutPayload};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

const DOCUMENT_EXTENSION: &str = ".json";

/// JSON documents stored as objects.
pub struct ObjectStoreDocumentStore {
    object_store: Arc<dyn ObjectStore>,
    prefix: String,
    max_document_bytes: usize,
}

impl ObjectStoreDocumentStore {
    /// Build the object store from blob config and store documents under `prefix`.
    pub async fn new(blob_config: &BlobConfig, prefix: impl Into<String>) -> DocumentResult<Self> {
        let object_store = blob_config.build_object_store().await?;
        Ok(Self::with_object_store(object_store, prefix))
    }

    /// Create with custom object store (for testing).
    pub fn with_object_store(object_store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            object_store,
            prefix: prefix.into(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Override the document size limit.
    pub fn with_max_document_bytes(mut self, max_document_bytes: usize) -> Self {
        self.max_document_bytes = max_document_bytes;
        self
    }

    /// Format: `{prefix}/documents/{collection}`
    fn collection_path(&self, collection: &str) -> String {
        let normalized_prefix = self.prefix.trim_matches('/');
        if normalized_prefix.is_empty() {
            format!("documents/{}", collection)
        } else {
            format!("{}/documents/{}", normalized_prefix, collection)
        }
    }

    /// Format: `{prefix}/documents/{collection}/{id}.json`
    fn storage_path(&self, collection: &str, id: &str) -> DocumentResult<ObjectPath> {
        let path = format!("{}/{}{}", self.collection_path(collection), id, DOCUMENT_EXTENSION);
        ObjectPath::parse(&path).map_err(|e| DocumentError::InvalidKey(e.to_string()))
    }

    async fn read(&self, location: &ObjectPath) -> DocumentResult<Option<Value>> {
        match self.object_store.get(location).await {
            Ok(result) => {
                let bytes = result.bytes().await.map_err(|e| {
                    error!(error = %e, path = %location, "Failed to read document bytes");
                    DocumentError::StorageError(format!("Failed to read document: {}", e))
                })?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => {
                error!(error = %e, path = %location, "Failed to get document");
                Err(DocumentError::StorageError(format!("Failed to get document: {}", e)))
            }
        }
    }
}

#[async_trait]
impl DocumentStore for ObjectStoreDocumentStore {
    #[instrument(skip(self, document), fields(collection = %collection, id = %id))]
    async fn set(&self, collection: &str, id: &str, document: &Value) -> DocumentResult<()> {
        let start = Instant::now();
        validate_key(collection, id)?;
        let encoded = encode_document(collection, id, document, self.max_document_bytes)?;
        let size_bytes = encoded.len();
        let location = self.storage_path(collection, id)?;

        self.object_store
            .put(&location, PutPayload::from(Bytes::from(encoded)))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to put document");
                DocumentError::StorageError(format!("Failed to put document: {}", e))
            })?;

        info!(
            duration_ms = start.elapsed().as_millis(),
            size_bytes,
            "Document stored successfully"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %collection, id = %id))]
    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Value>> {
        let start = Instant::now();
        validate_key(collection, id)?;
        let location = self.storage_path(collection, id)?;
        let document = self.read(&location).await?;
        debug!(
            duration_ms = start.elapsed().as_millis(),
            found = document.is_some(),
            "Document lookup finished"
        );
        Ok(document)
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn list(&self, collection: &str) -> DocumentResult<Vec<Value>> {
        let start = Instant::now();
        let base = ObjectPath::parse(self.collection_path(collection))
            .map_err(|e| DocumentError::InvalidKey(e.to_string()))?;

        let mut locations = Vec::new();
        let mut stream = self.object_store.list(Some(&base));
        while let Some(result) = stream.next().await {
            let meta = result.map_err(|e| {
                error!(error = %e, "Failed to list documents");
                DocumentError::StorageError(format!("Failed to list documents: {}", e))
            })?;
            if meta.location.as_ref().ends_with(DOCUMENT_EXTENSION) {
                locations.push(meta.location);
            } else {
                trace!(path = %meta.location, "Skipping non-document object");
            }
        }
        locations.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));

        let mut documents = Vec::with_capacity(locations.len());
        for location in locations {
            match self.read(&location).await {
                Ok(Some(document)) => documents.push(document),
                // Deleted between list and get
                Ok(None) => warn!(path = %location, "Document vanished during list"),
                Err(DocumentError::SerializationError(e)) => {
                    warn!(path = %location, error = %e, "Skipping unparseable document");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            duration_ms = start.elapsed().as_millis(),
            count = documents.len(),
            "Listed documents successfully"
        );
        Ok(documents)
    }

    #[instrument(skip(self), fields(collection = %collection, id = %id))]
    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        validate_key(collection, id)?;
        let location = self.storage_path(collection, id)?;
        match self.object_store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                info!("Document deleted");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to delete document");
                Err(DocumentError::StorageError(format!("Failed to delete document: {}", e)))
            }
        }
    }

    fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }
}
