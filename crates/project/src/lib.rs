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

//! Catalog Vault Project Persistence
//!
//! ## Purpose
//! Stores a project (product catalog, per-product images, source spreadsheet)
//! across a size-limited document store and a blob store, and keeps the two
//! consistent across repeated partial saves.
//!
//! ## Architecture
//! - **AssetReconciler**: diffs old and new image mappings, uploads changed
//!   images, deletes orphans
//! - **PayloadOffloader**: keeps the bulk product list in a JSON blob
//! - **SaveGuard**: rejects overlapping saves of one project
//! - **ProjectStore**: orchestrates save, load, list and delete
//!
//! ## Stored Layout
//! - document `projects/{id}`: metadata, `productCount`, `payloadBlobPath`,
//!   `imageAssetMapping`, spreadsheet location
//! - blobs under `projects/{id}/`: `images/*`, `products_data.json`, the spreadsheet

pub mod asset;
pub mod config;
mod deadline;
pub mod document;
pub mod error;
pub mod guard;
pub mod layout;
pub mod model;
pub mod offloader;
pub mod reconciler;
pub mod store;

pub use asset::{AssetRef, ImageAssetMapping, RawAssetRef, StoredAssetRef};
pub use config::{ProjectStoreConfig, DEFAULT_COLLECTION};
pub use document::ProjectDocument;
pub use error::{ProjectError, ProjectResult};
pub use guard::{SaveGuard, SaveTicket};
pub use model::{
    content_type_for, filter_options_from, image_filename_matches, normalize_product_id,
    FilterOptions, PendingChanges, PendingImage, Product, Project,
};
pub use offloader::{PayloadOffloader, RestoredPayload};
pub use reconciler::{AssetReconciler, PlannedUpload, ReconcilePlan, ReconciledAssets};
pub use store::{ProjectStore, ProjectSummary, ProjectView};
