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

//! Product payload offloading.
//!
//! The product list can outgrow the document store's size limit, so it always
//! lives in a JSON blob at `projects/{id}/products_data.json`:
//!
//! ```json
//! { "products": [...], "filterOptions": { "ATT Color": ["Blue", "Red"] } }
//! ```
//!
//! Older payloads are a bare product array; filter options are then absent and
//! recomputed by the caller.

use crate::deadline::bounded;
use crate::layout::payload_path;
use crate::model::{FilterOptions, Product};
use crate::ProjectResult;
use catalogvault_blob::BlobStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

const PAYLOAD_CONTENT_TYPE: &str = "application/json";

/// Products and filter options read back from a payload blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredPayload {
    pub products: Vec<Product>,
    /// `None` for legacy bare-array payloads
    pub filter_options: Option<FilterOptions>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a> {
    products: &'a [Product],
    filter_options: &'a FilterOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPayload {
    Legacy(Vec<Product>),
    Envelope {
        #[serde(default, alias = "products_data")]
        products: Vec<Product>,
        #[serde(default, rename = "filterOptions", alias = "filter_options")]
        filter_options: Option<FilterOptions>,
    },
}

/// Writes and reads the offloaded product payload.
pub struct PayloadOffloader {
    blobs: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl PayloadOffloader {
    pub fn new(blobs: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { blobs, timeout }
    }

    /// Write the payload and return its blob path.
    ///
    /// Display URLs are not persisted with the products; the asset mapping is
    /// the source of truth for images.
    #[instrument(skip(self, products, filter_options), fields(project_id = %project_id, products = products.len()))]
    pub async fn offload(
        &self,
        project_id: &str,
        products: &[Product],
        filter_options: &FilterOptions,
    ) -> ProjectResult<String> {
        let start = Instant::now();
        let stripped: Vec<Product> = products
            .iter()
            .map(|p| Product {
                image_asset_ref: None,
                pending_image: None,
                ..p.clone()
            })
            .collect();
        let body = serde_json::to_vec(&EnvelopeRef {
            products: &stripped,
            filter_options,
        })?;
        let size = body.len();

        let path = payload_path(project_id);
        bounded(
            self.timeout,
            format!("upload {}", path),
            self.blobs.put(&path, body, PAYLOAD_CONTENT_TYPE),
        )
        .await?;

        info!(
            duration_ms = start.elapsed().as_millis(),
            size_bytes = size,
            "Product payload offloaded"
        );
        Ok(path)
    }

    /// Raw bytes of the payload at `blob_path`, kept so a failed save can put
    /// them back after `offload` overwrote the blob in place.
    pub async fn snapshot(&self, blob_path: &str) -> ProjectResult<Option<Vec<u8>>> {
        bounded(
            self.timeout,
            format!("download {}", blob_path),
            self.blobs.get(blob_path),
        )
        .await
    }

    /// Write snapshot bytes back. Best-effort: failures are logged.
    #[instrument(skip(self, bytes), fields(path = %blob_path, size = bytes.len()))]
    pub async fn reinstate(&self, blob_path: &str, bytes: Vec<u8>) {
        let result = bounded(
            self.timeout,
            format!("upload {}", blob_path),
            self.blobs.put(blob_path, bytes, PAYLOAD_CONTENT_TYPE),
        )
        .await;
        match result {
            Ok(_) => info!("Previous product payload reinstated"),
            Err(e) => error!(error = %e, "Failed to reinstate previous product payload"),
        }
    }

    /// Read a payload back. `Ok(None)` if the blob does not exist.
    #[instrument(skip(self), fields(path = %blob_path))]
    pub async fn restore(&self, blob_path: &str) -> ProjectResult<Option<RestoredPayload>> {
        let start = Instant::now();
        let Some(bytes) = bounded(
            self.timeout,
            format!("download {}", blob_path),
            self.blobs.get(blob_path),
        )
        .await?
        else {
            return Ok(None);
        };

        let restored = match serde_json::from_slice::<StoredPayload>(&bytes)? {
            StoredPayload::Legacy(products) => RestoredPayload {
                products,
                filter_options: None,
            },
            StoredPayload::Envelope {
                products,
                filter_options,
            } => RestoredPayload {
                products,
                filter_options,
            },
        };

        debug!(
            duration_ms = start.elapsed().as_millis(),
            products = restored.products.len(),
            "Product payload restored"
        );
        Ok(Some(restored))
    }
}
