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

//! Error types for project persistence.
//!
//! ## Taxonomy
//! - **NotFound**: an operation that requires an existing project found none.
//!   `load_project` reports absence as `Ok(None)` instead.
//! - **Transient store failures**: [`ProjectError::Blob`], [`ProjectError::Document`]
//!   and [`ProjectError::Timeout`]. Retried by the caller, never looped internally.
//! - **CorruptReference**: a stored asset reference that no codec rule accepts.
//!   Logged and treated as "no image" on load; only surfaced by helpers that
//!   resolve a single reference.
//! - **ConcurrentSaveRejected**: the debounce guard refused a second save.

use catalogvault_blob::BlobError;
use catalogvault_document::DocumentError;
use std::time::Duration;
use thiserror::Error;

/// Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Errors returned by the persistence layer.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Project does not exist
    #[error("Project not found: {0}")]
    NotFound(String),

    /// A save for this project is already in flight in this process
    #[error("Save already in progress for project {0}")]
    ConcurrentSaveRejected(String),

    /// Blob store failure
    #[error("Blob store failure: {0}")]
    Blob(#[from] BlobError),

    /// Document store failure
    #[error("Document store failure: {0}")]
    Document(#[from] DocumentError),

    /// Store operation exceeded its timeout
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Operation label, e.g. `upload projects/p1/images/a.png`
        operation: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// Stored asset reference is neither a known scheme nor in the bucket
    #[error("Corrupt asset reference for {key}: {reference}")]
    CorruptReference {
        /// Mapping key (lowercase product id)
        key: String,
        /// Raw stored reference
        reference: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid caller input (ids, filenames)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ProjectError {
    /// True for network/timeout style failures the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProjectError::Blob(_) | ProjectError::Document(_) | ProjectError::Timeout { .. }
        )
    }

    /// True when the debounce guard rejected the call.
    pub fn is_concurrent_save(&self) -> bool {
        matches!(self, ProjectError::ConcurrentSaveRejected(_))
    }
}
