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

//! Error types for document store operations.

use thiserror::Error;

/// Result type for document store operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur during document store operations.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Invalid collection or document id
    #[error("Invalid document key: {0}")]
    InvalidKey(String),

    /// Document is not a JSON object
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Encoded document exceeds the store's size limit
    #[error("Document {collection}/{id} is {size} bytes, limit is {limit} bytes")]
    DocumentTooLarge {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
        /// Encoded size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Storage error (network, object store, etc.)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(err: serde_json::Error) -> Self {
        DocumentError::SerializationError(err.to_string())
    }
}

impl From<object_store::Error> for DocumentError {
    fn from(err: object_store::Error) -> Self {
        DocumentError::StorageError(err.to_string())
    }
}

impl From<catalogvault_blob::BlobError> for DocumentError {
    fn from(err: catalogvault_blob::BlobError) -> Self {
        match err {
            catalogvault_blob::BlobError::ConfigError(msg) => DocumentError::ConfigError(msg),
            other => DocumentError::StorageError(other.to_string()),
        }
    }
}
