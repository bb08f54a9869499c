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

//! Project store configuration.
//!
//! ## Environment Variables
//! - `CATALOGVAULT_COLLECTION`: document collection (default: `projects`)
//! - `CATALOGVAULT_OP_TIMEOUT_SECS`: per-operation timeout (default: 30)
//! - `CATALOGVAULT_IMAGE_CONTENT_TYPE`: fallback image content type (default: `image/png`)

use crate::{ProjectError, ProjectResult};
use std::time::Duration;

/// Default document collection.
pub const DEFAULT_COLLECTION: &str = "projects";

/// Configuration for [`crate::ProjectStore`].
#[derive(Debug, Clone)]
pub struct ProjectStoreConfig {
    /// Document collection holding the lightweight project documents
    pub collection: String,
    /// Timeout applied to every individual store operation
    pub operation_timeout: Duration,
    /// Content type used when an image filename has no known extension
    pub default_image_content_type: String,
}

impl Default for ProjectStoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            operation_timeout: Duration::from_secs(30),
            default_image_content_type: "image/png".to_string(),
        }
    }
}

impl ProjectStoreConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> ProjectResult<Self> {
        let defaults = Self::default();
        let operation_timeout = match std::env::var("CATALOGVAULT_OP_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                ProjectError::InvalidInput(format!(
                    "CATALOGVAULT_OP_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })?),
            Err(_) => defaults.operation_timeout,
        };

        Ok(Self {
            collection: std::env::var("CATALOGVAULT_COLLECTION").unwrap_or(defaults.collection),
            operation_timeout,
            default_image_content_type: std::env::var("CATALOGVAULT_IMAGE_CONTENT_TYPE")
                .unwrap_or(defaults.default_image_content_type),
        })
    }

    /// Override the per-operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}
