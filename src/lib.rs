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

//! Catalog Vault: project persistence and image asset synchronization
//!
//! Core design:
//! - Lightweight metadata in a size-limited document store
//! - Bulk product payload, images and spreadsheet snapshots in a blob store
//! - Every save reconciles image blobs so nothing is orphaned or lost
//! - Loads tolerate every historical reference shape and self-heal on save
//!
//! Crates:
//! 1. `catalogvault-blob`: blob store client and path/URL codec
//! 2. `catalogvault-document`: document store client
//! 3. `catalogvault-project`: reconciler, offloader and `ProjectStore`

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub use catalogvault_blob as blob;
pub use catalogvault_document as document;
pub use catalogvault_project as project;

// Re-export the collaborator-facing types for convenience
pub use blob::{BlobConfig, BlobError, BlobPathCodec, BlobStore, ObjectStoreBlobStore};
pub use document::{
    create_document_store_from_config, DocumentConfig, DocumentError, DocumentStore,
    InMemoryDocumentStore, ObjectStoreDocumentStore,
};
pub use project::{
    filter_options_from, image_filename_matches, AssetRef, ImageAssetMapping, PendingImage,
    Product, Project, ProjectError, ProjectResult, ProjectStore, ProjectStoreConfig,
    ProjectSummary, ProjectView,
};
