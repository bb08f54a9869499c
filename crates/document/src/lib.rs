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

//! # Catalog Vault Document Store
//!
//! ## Purpose
//! Stores the small, always-fetched metadata record of each project. Models
//! a size-limited document database (Firestore caps documents at 1 MiB): any
//! write whose encoded form exceeds the limit is rejected rather than
//! truncated, which is why bulk product lists live in blob storage instead.
//!
//! ## Key Components
//!
//! - [`DocumentStore`]: `set`/`get`/`list`/`delete` over JSON object documents
//! - [`InMemoryDocumentStore`]: HashMap-based implementation for tests and
//!   single-process use
//! - [`ObjectStoreDocumentStore`]: JSON documents stored as objects under
//!   `{prefix}/documents/{collection}/{id}.json`
//! - [`DocumentError`]: error types for all operations
//!
//! ## Examples
//! ```rust
//! use catalogvault_document::{DocumentStore, InMemoryDocumentStore};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryDocumentStore::new();
//! store.set("projects", "p1", &json!({"id": "p1", "name": "Spring"})).await?;
//! let doc = store.get("projects", "p1").await?;
//! assert_eq!(doc.unwrap()["name"], "Spring");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_trait::async_trait;
use serde_json::Value;

pub mod blob;
pub mod config;
pub mod error;
pub mod memory;

pub use blob::ObjectStoreDocumentStore;
pub use config::{create_document_store_from_config, DocumentBackend, DocumentConfig};
pub use error::{DocumentError, DocumentResult};
pub use memory::InMemoryDocumentStore;

/// Firestore's per-document limit.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// Document store trait.
///
/// Documents are JSON objects addressed by `(collection, id)`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or replace a document.
    ///
    /// ## Errors
    /// - [`DocumentError::DocumentTooLarge`] if the encoded document exceeds the limit
    /// - [`DocumentError::InvalidDocument`] if `document` is not a JSON object
    async fn set(&self, collection: &str, id: &str, document: &Value) -> DocumentResult<()>;

    /// Read a document.
    ///
    /// ## Returns
    /// - `Ok(Some(document))` if it exists
    /// - `Ok(None)` if it does not
    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Value>>;

    /// All documents in a collection, ordered by id.
    async fn list(&self, collection: &str) -> DocumentResult<Vec<Value>>;

    /// Delete a document. Succeeds if it does not exist.
    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()>;

    /// Largest encoded document this store accepts, in bytes.
    fn max_document_bytes(&self) -> usize;

    /// Run the checks `set` would apply without writing anything.
    ///
    /// Returns the encoded size. Lets callers fail before touching other
    /// storage that the document would reference.
    fn check(&self, collection: &str, id: &str, document: &Value) -> DocumentResult<usize> {
        validate_key(collection, id)?;
        encode_document(collection, id, document, self.max_document_bytes()).map(|bytes| bytes.len())
    }
}

/// Reject empty keys and keys that would escape their collection.
pub(crate) fn validate_key(collection: &str, id: &str) -> DocumentResult<()> {
    for (label, key) in [("collection", collection), ("id", id)] {
        if key.trim().is_empty() {
            return Err(DocumentError::InvalidKey(format!("{} cannot be empty", label)));
        }
        if key.contains('/') || key == "." || key == ".." {
            return Err(DocumentError::InvalidKey(format!("{} '{}' is not allowed", label, key)));
        }
    }
    Ok(())
}

/// Encode `document`, enforcing the object shape and the size limit.
pub(crate) fn encode_document(
    collection: &str,
    id: &str,
    document: &Value,
    limit: usize,
) -> DocumentResult<Vec<u8>> {
    if !document.is_object() {
        return Err(DocumentError::InvalidDocument(format!(
            "{}/{} must be a JSON object",
            collection, id
        )));
    }
    let encoded = serde_json::to_vec(document)?;
    if encoded.len() > limit {
        return Err(DocumentError::DocumentTooLarge {
            collection: collection.to_string(),
            id: id.to_string(),
            size: encoded.len(),
            limit,
        });
    }
    Ok(encoded)
}
