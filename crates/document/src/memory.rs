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

//! In-memory document store implementation.
//!
//! ## Purpose
//! Provides a HashMap-based implementation for testing and single-process scenarios.
//!
//! ## Limitations
//! - Not persistent (data lost on restart)
//! - Not distributed (single process only)

use crate::{encode_document, validate_key, DocumentResult, DocumentStore, DEFAULT_MAX_DOCUMENT_BYTES};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// In-memory document store.
///
/// Documents are kept as parsed JSON but still pass through the same
/// size check as persistent backends, so size-limit behavior is testable.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, Value>>>>,
    max_document_bytes: usize,
}

impl InMemoryDocumentStore {
    /// Create a store with the default 1 MiB document limit.
    pub fn new() -> Self {
        Self::with_max_document_bytes(DEFAULT_MAX_DOCUMENT_BYTES)
    }

    /// Create a store with a custom document limit.
    pub fn with_max_document_bytes(max_document_bytes: usize) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            max_document_bytes,
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip(self, document))]
    async fn set(&self, collection: &str, id: &str, document: &Value) -> DocumentResult<()> {
        validate_key(collection, id)?;
        let encoded = encode_document(collection, id, document, self.max_document_bytes)?;

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());
        debug!(size_bytes = encoded.len(), "Document stored");
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Value>> {
        validate_key(collection, id)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> DocumentResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        validate_key(collection, id)?;
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }
}
