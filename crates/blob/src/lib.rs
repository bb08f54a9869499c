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

//! Catalog Vault Blob Storage
//!
//! ## Purpose
//! Stores the binary side of a project: product images, the offloaded product
//! payload and the source spreadsheet snapshot.
//! Supports multiple backends through `object_store`: GCP Cloud Storage,
//! S3/MinIO, local filesystem and in-memory.
//!
//! ## Architecture
//! - **BlobStore**: thin `put`/`get`/`delete`/`list_by_prefix` client
//! - **BlobPathCodec**: pure conversions between bucket-relative paths,
//!   `gs://` URIs and public HTTPS URLs
//! - **Path Structure**: bucket-relative, e.g. `projects/{project_id}/images/{name}`
//!
//! ## Usage
//! ```rust
//! use catalogvault_blob::{BlobStore, ObjectStoreBlobStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ObjectStoreBlobStore::in_memory("catalog-bucket");
//! store.put("projects/p1/products_data.json", b"[]".to_vec(), "application/json").await?;
//! let paths = store.list_by_prefix("projects/p1").await?;
//! assert_eq!(paths, vec!["projects/p1/products_data.json".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod store;

pub use codec::{BlobPathCodec, DEFAULT_PUBLIC_HOST};
pub use config::BlobConfig;
pub use error::{BlobError, BlobResult};
pub use store::{BlobStore, ObjectStoreBlobStore};
