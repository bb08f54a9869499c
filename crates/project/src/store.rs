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

//! Project store orchestrator.
//!
//! ## Save sequence
//! 1. Claim the per-project save guard (reject if busy)
//! 2. Read the previous document and normalize its asset mapping
//! 3. Upload changed images concurrently
//! 4. Upload the spreadsheet snapshot, if bytes were given
//! 5. Build the lightweight document and check it against the store's limits
//! 6. Offload the product payload, keeping the bytes it overwrites
//! 7. Write the lightweight document
//! 8. Delete orphaned blobs (best-effort)
//!
//! Nothing the previous document references is overwritten before step 5
//! passes or deleted before step 7 succeeds. A failure removes blobs this save
//! created and puts the previous payload back, so the previous document still
//! reads as it did.

use crate::asset::{AssetRef, ImageAssetMapping, RawAssetRef};
use crate::deadline::bounded;
use crate::document::ProjectDocument;
use crate::guard::SaveGuard;
use crate::layout::{
    is_project_path, payload_path, project_prefix, spreadsheet_path, validate_filename,
    validate_project_id,
};
use crate::model::{content_type_for, filter_options_from, normalize_product_id, Project};
use crate::offloader::PayloadOffloader;
use crate::reconciler::AssetReconciler;
use crate::{ProjectError, ProjectResult, ProjectStoreConfig};
use catalogvault_blob::{BlobConfig, BlobStore, ObjectStoreBlobStore};
use catalogvault_document::{create_document_store_from_config, DocumentConfig, DocumentStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

const SPREADSHEET_FALLBACK_TYPE: &str = "application/octet-stream";

/// A loaded project with display-ready image URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectView {
    /// Project data; every product's `image_asset_ref` is a display URL or `None`
    pub project: Project,
    /// Normalized mapping, including entries recovered from embedded URLs
    pub asset_mapping: ImageAssetMapping,
    /// Blob holding the offloaded products, absent for empty or legacy projects
    pub payload_blob_path: Option<String>,
    /// Blob holding the source spreadsheet snapshot
    pub spreadsheet_blob_path: Option<String>,
    /// Public URL of the spreadsheet snapshot
    pub spreadsheet_url: Option<String>,
}

/// Listing entry, built from the lightweight document alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Project id
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// First save, if recorded
    pub created_at: Option<DateTime<Utc>>,
    /// Latest save, falling back to `created_at`
    pub last_modified_at: Option<DateTime<Utc>>,
    /// Stored `productCount`, or the inline list length for legacy documents
    pub product_count: usize,
    /// Number of attribute columns
    pub attribute_count: usize,
    /// Staged edits not yet applied
    pub pending_change_count: usize,
}

/// Persists projects across a document store and a blob store.
///
/// ## Example
/// ```rust
/// use catalogvault_blob::ObjectStoreBlobStore;
/// use catalogvault_document::InMemoryDocumentStore;
/// use catalogvault_project::{PendingImage, Product, Project, ProjectStore, ProjectStoreConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ProjectStore::new(
///     Arc::new(InMemoryDocumentStore::new()),
///     Arc::new(ObjectStoreBlobStore::in_memory("catalog-bucket")),
///     ProjectStoreConfig::default(),
/// );
///
/// let project = Project::new("p1", "Spring").with_products(
///     vec![],
///     vec![],
///     vec![Product::new("ABC123", "Hat", "10.00")
///         .with_image(PendingImage::new("abc123.png", vec![0x89, 0x50]))],
/// );
/// let mapping = store.save_project("p1", &project).await?;
/// assert!(mapping.contains_key("abc123"));
///
/// let view = store.load_project("p1").await?.expect("saved");
/// assert!(view.project.products[0].image_asset_ref.is_some());
/// # Ok(())
/// # }
/// ```
pub struct ProjectStore {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    config: ProjectStoreConfig,
    guard: SaveGuard,
    reconciler: AssetReconciler,
    offloader: PayloadOffloader,
}

impl ProjectStore {
    /// Create a store over explicit backends.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: ProjectStoreConfig,
    ) -> Self {
        let reconciler = AssetReconciler::new(
            Arc::clone(&blobs),
            config.operation_timeout,
            config.default_image_content_type.clone(),
        );
        let offloader = PayloadOffloader::new(Arc::clone(&blobs), config.operation_timeout);
        Self {
            documents,
            blobs,
            config,
            guard: SaveGuard::new(),
            reconciler,
            offloader,
        }
    }

    /// Create a store from `CATALOGVAULT_*` environment variables.
    pub async fn from_env() -> ProjectResult<Self> {
        let blobs = ObjectStoreBlobStore::new(BlobConfig::from_env()).await?;
        let documents = create_document_store_from_config(&DocumentConfig::from_env()?).await?;
        Ok(Self::new(documents, Arc::new(blobs), ProjectStoreConfig::from_env()?))
    }

    pub fn config(&self) -> &ProjectStoreConfig {
        &self.config
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Persist `project` under `project_id` and return the final asset mapping.
    ///
    /// ## Errors
    /// - [`ProjectError::ConcurrentSaveRejected`] if a save for this id is running
    /// - [`ProjectError::InvalidInput`] for bad ids or filenames
    /// - store and timeout errors from any upload or the document write
    #[instrument(skip(self, project), fields(project_id = %project_id, products = project.products.len()))]
    pub async fn save_project(
        &self,
        project_id: &str,
        project: &Project,
    ) -> ProjectResult<ImageAssetMapping> {
        let start = Instant::now();
        validate_project_id(project_id)?;
        let _ticket = self.guard.try_acquire(project_id).ok_or_else(|| {
            warn!("Save rejected, another save is in flight");
            ProjectError::ConcurrentSaveRejected(project_id.to_string())
        })?;

        let previous = self.read_document(project_id).await?;
        let old_mapping = previous
            .as_ref()
            .map(|doc| self.normalize_mapping(project_id, &doc.image_asset_mapping))
            .unwrap_or_default();

        let plan = self
            .reconciler
            .reconcile(project_id, &old_mapping, &project.products)?;
        let assets = self.reconciler.upload(plan).await?;
        let mut fresh = assets.fresh.clone();

        let spreadsheet = match self
            .stage_spreadsheet(project_id, project, previous.as_ref(), &mut fresh)
            .await
        {
            Ok(spreadsheet) => spreadsheet,
            Err(e) => {
                error!(error = %e, "Save aborted before document write");
                self.reconciler.rollback(&fresh).await;
                return Err(e);
            }
        };

        let payload_blob_path =
            (!project.products.is_empty()).then(|| payload_path(project_id));
        let document = self.build_document(
            project_id,
            project,
            previous.as_ref(),
            &assets.mapping,
            payload_blob_path.clone(),
            spreadsheet.clone(),
        );
        let written = match self
            .write_payload_and_document(project_id, project, previous.as_ref(), &document)
            .await
        {
            Ok(written) => written,
            Err(e) => {
                error!(error = %e, "Save aborted, previous document kept");
                self.reconciler.rollback(&fresh).await;
                return Err(e);
            }
        };

        let mut keep: BTreeSet<&str> = assets
            .mapping
            .values()
            .filter_map(AssetRef::blob_path)
            .collect();
        keep.extend(payload_blob_path.as_deref());
        keep.extend(spreadsheet.as_ref().map(|(path, _)| path.as_str()));

        let mut orphans: BTreeSet<String> = assets.deletions.iter().cloned().collect();
        if let Some(doc) = &previous {
            orphans.extend(doc.payload_blob_path.iter().cloned());
            orphans.extend(doc.excel_blob_path.iter().cloned());
        }
        let orphans: Vec<String> = orphans
            .into_iter()
            .filter(|path| is_project_path(project_id, path) && !keep.contains(path.as_str()))
            .collect();
        let deleted = self.reconciler.delete_orphans(&orphans).await;

        info!(
            duration_ms = start.elapsed().as_millis(),
            images = assets.mapping.len(),
            document_bytes = written,
            orphans_deleted = deleted,
            orphans_found = orphans.len(),
            "Project saved"
        );
        Ok(assets.mapping)
    }

    /// Load a project with display-ready image URLs. `Ok(None)` if absent.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn load_project(&self, project_id: &str) -> ProjectResult<Option<ProjectView>> {
        let start = Instant::now();
        validate_project_id(project_id)?;
        let Some(doc) = self.read_document(project_id).await? else {
            debug!("Project not found");
            return Ok(None);
        };

        let mut products = doc.products.clone().unwrap_or_default();
        let mut filter_options = doc.filter_options.clone();
        if let Some(path) = &doc.payload_blob_path {
            match self.offloader.restore(path).await? {
                Some(payload) => {
                    products = payload.products;
                    filter_options = payload.filter_options.or(filter_options);
                }
                None => warn!(path = %path, "Payload blob missing, using inline products"),
            }
        }
        let filter_options =
            filter_options.unwrap_or_else(|| filter_options_from(&products, &doc.attributes));

        let codec = self.blobs.codec();
        let mut asset_mapping = self.normalize_mapping(project_id, &doc.image_asset_mapping);
        for product in &mut products {
            product.pending_image = None;
            let key = product.normalized_id();
            if let Some(asset) = asset_mapping.get(&key) {
                product.image_asset_ref = Some(asset.url().to_string());
                continue;
            }
            let embedded = product.image_asset_ref.take();
            let Some(url) = embedded else {
                continue;
            };
            match (AssetRef::LegacyUrl { url: url.clone() }).normalize(codec) {
                Some(asset) => {
                    product.image_asset_ref = Some(asset.url().to_string());
                    if !key.is_empty() {
                        asset_mapping.insert(key, asset);
                    }
                }
                None => {
                    warn!(key = %key, reference = %url, "Ignoring corrupt embedded image reference");
                }
            }
        }

        let now = Utc::now();
        let last_modified_at = doc.last_modified.or(doc.created_date).unwrap_or(now);
        let project = Project {
            id: if doc.id.is_empty() {
                project_id.to_string()
            } else {
                doc.id.clone()
            },
            name: doc.name.clone(),
            description: doc.description.clone(),
            created_at: doc.created_date.unwrap_or(last_modified_at),
            last_modified_at,
            attribute_keys: doc.attributes.clone(),
            distribution_keys: doc.distributions.clone(),
            filter_options,
            pending_changes: doc.pending_changes.clone(),
            products,
            source_spreadsheet_name: doc.excel_filename.clone(),
            spreadsheet_bytes: None,
        };

        debug!(
            duration_ms = start.elapsed().as_millis(),
            products = project.products.len(),
            images = asset_mapping.len(),
            "Project loaded"
        );
        Ok(Some(ProjectView {
            project,
            asset_mapping,
            payload_blob_path: doc.payload_blob_path,
            spreadsheet_blob_path: doc.excel_blob_path,
            spreadsheet_url: doc.excel_url,
        }))
    }

    /// Summaries of every project, most recently modified first.
    ///
    /// Reads lightweight documents only; payloads and images are never fetched.
    #[instrument(skip(self))]
    pub async fn list_project_summaries(&self) -> ProjectResult<Vec<ProjectSummary>> {
        let start = Instant::now();
        let collection = &self.config.collection;
        let raw = bounded(
            self.config.operation_timeout,
            format!("list {}", collection),
            self.documents.list(collection),
        )
        .await?;

        let mut summaries: Vec<ProjectSummary> = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<ProjectDocument>(value) {
                Ok(doc) if !doc.id.is_empty() => Some(summary_of(&doc)),
                Ok(_) => {
                    warn!("Skipping project document without id");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable project document");
                    None
                }
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.last_modified_at
                .cmp(&a.last_modified_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(
            duration_ms = start.elapsed().as_millis(),
            count = summaries.len(),
            "Listed project summaries"
        );
        Ok(summaries)
    }

    /// Delete a project's blobs, then its document.
    ///
    /// Blob deletion failures are logged and skipped; only the document delete
    /// is reported. Referenced blobs outside `projects/{id}/` are left alone.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn delete_project(&self, project_id: &str) -> ProjectResult<()> {
        let start = Instant::now();
        validate_project_id(project_id)?;

        let mut paths = BTreeSet::new();
        match self.read_document(project_id).await {
            Ok(Some(doc)) => {
                paths.extend(doc.payload_blob_path.iter().cloned());
                paths.extend(doc.excel_blob_path.iter().cloned());
                paths.extend(
                    self.normalize_mapping(project_id, &doc.image_asset_mapping)
                        .values()
                        .filter_map(AssetRef::blob_path)
                        .filter(|path| is_project_path(project_id, path))
                        .map(str::to_string),
                );
            }
            Ok(None) => debug!("No project document, sweeping prefix only"),
            Err(e) => warn!(error = %e, "Could not read project document, sweeping prefix only"),
        }

        let prefix = project_prefix(project_id);
        match bounded(
            self.config.operation_timeout,
            format!("list {}", prefix),
            self.blobs.list_by_prefix(&prefix),
        )
        .await
        {
            Ok(listed) => paths.extend(listed),
            Err(e) => warn!(error = %e, prefix = %prefix, "Failed to list project blobs"),
        }

        let paths: Vec<String> = paths.into_iter().collect();
        let deleted = self.reconciler.delete_orphans(&paths).await;

        bounded(
            self.config.operation_timeout,
            format!("delete document {}", project_id),
            self.documents.delete(&self.config.collection, project_id),
        )
        .await?;

        info!(
            duration_ms = start.elapsed().as_millis(),
            blobs_deleted = deleted,
            blobs_found = paths.len(),
            "Project deleted"
        );
        Ok(())
    }

    /// Stored spreadsheet snapshot as `(filename, bytes)`.
    ///
    /// ## Errors
    /// - [`ProjectError::NotFound`] if the project does not exist
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn load_spreadsheet(
        &self,
        project_id: &str,
    ) -> ProjectResult<Option<(String, Vec<u8>)>> {
        validate_project_id(project_id)?;
        let doc = self
            .read_document(project_id)
            .await?
            .ok_or_else(|| ProjectError::NotFound(project_id.to_string()))?;

        let codec = self.blobs.codec();
        let path = doc
            .excel_blob_path
            .clone()
            .or_else(|| doc.excel_url.as_deref().and_then(|url| codec.to_path(url)))
            .or_else(|| {
                doc.excel_filename
                    .as_deref()
                    .filter(|name| validate_filename(name).is_ok())
                    .map(|name| spreadsheet_path(project_id, name))
            });
        let Some(path) = path else {
            return Ok(None);
        };

        let bytes = bounded(
            self.config.operation_timeout,
            format!("download {}", path),
            self.blobs.get(&path),
        )
        .await?;
        let filename = doc
            .excel_filename
            .clone()
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());
        Ok(bytes.map(|bytes| (filename, bytes)))
    }

    /// Upload the spreadsheet if bytes were given, else carry the previous one.
    /// A new path is pushed to `fresh`.
    async fn stage_spreadsheet(
        &self,
        project_id: &str,
        project: &Project,
        previous: Option<&ProjectDocument>,
        fresh: &mut Vec<String>,
    ) -> ProjectResult<Option<(String, String)>> {
        match (&project.source_spreadsheet_name, &project.spreadsheet_bytes) {
            (Some(filename), Some(bytes)) => {
                validate_filename(filename)?;
                let path = spreadsheet_path(project_id, filename);
                let content_type = content_type_for(filename).unwrap_or(SPREADSHEET_FALLBACK_TYPE);
                let result = bounded(
                    self.config.operation_timeout,
                    format!("upload {}", path),
                    self.blobs.put(&path, bytes.clone(), content_type),
                )
                .await;
                // A timed-out put may still land later.
                if previous.and_then(|doc| doc.excel_blob_path.as_deref()) != Some(path.as_str()) {
                    fresh.push(path.clone());
                }
                Ok(Some((path, result?)))
            }
            (None, Some(_)) => Err(ProjectError::InvalidInput(
                "spreadsheet bytes given without a filename".to_string(),
            )),
            _ => Ok(previous.and_then(|doc| {
                let path = doc.excel_blob_path.clone()?;
                let url = doc
                    .excel_url
                    .clone()
                    .unwrap_or_else(|| self.blobs.codec().to_url(&path));
                Some((path, url))
            })),
        }
    }

    /// Offload the payload, then write `document`. Returns the document size.
    ///
    /// The document is checked before the payload blob is touched. If the
    /// payload or the document write fails, the payload blob goes back to what
    /// the previous document saw: its old bytes, or nothing.
    async fn write_payload_and_document(
        &self,
        project_id: &str,
        project: &Project,
        previous: Option<&ProjectDocument>,
        document: &ProjectDocument,
    ) -> ProjectResult<usize> {
        let collection = &self.config.collection;
        let value = serde_json::to_value(document)?;
        let size = self.documents.check(collection, project_id, &value)?;

        let Some(path) = document.payload_blob_path.as_deref() else {
            self.write_document(project_id, &value).await?;
            return Ok(size);
        };

        let previous_payload = match previous.and_then(|doc| doc.payload_blob_path.as_deref()) {
            Some(old) if old == path => self.offloader.snapshot(path).await?,
            _ => None,
        };
        let outcome = match self
            .offloader
            .offload(project_id, &project.products, &project.filter_options)
            .await
        {
            Ok(_) => self.write_document(project_id, &value).await,
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            match previous_payload {
                Some(bytes) => self.offloader.reinstate(path, bytes).await,
                None => self.reconciler.rollback(&[path.to_string()]).await,
            }
            return Err(e);
        }
        Ok(size)
    }

    fn build_document(
        &self,
        project_id: &str,
        project: &Project,
        previous: Option<&ProjectDocument>,
        mapping: &ImageAssetMapping,
        payload_blob_path: Option<String>,
        spreadsheet: Option<(String, String)>,
    ) -> ProjectDocument {
        let now = Utc::now();
        let last_modified = [
            Some(now),
            Some(project.last_modified_at),
            previous.and_then(|doc| doc.last_modified),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(now);
        let created_date = previous
            .and_then(|doc| doc.created_date)
            .unwrap_or(project.created_at);
        let (excel_blob_path, excel_url) = spreadsheet.unzip();

        ProjectDocument {
            id: project_id.to_string(),
            name: project.name.clone(),
            description: project.description.clone(),
            created_date: Some(created_date),
            last_modified: Some(last_modified),
            attributes: project.attribute_keys.clone(),
            distributions: project.distribution_keys.clone(),
            filter_options: None,
            pending_changes: project.pending_changes.clone(),
            excel_filename: project
                .source_spreadsheet_name
                .clone()
                .or_else(|| previous.and_then(|doc| doc.excel_filename.clone())),
            product_count: Some(project.products.len()),
            payload_blob_path,
            image_asset_mapping: mapping
                .iter()
                .map(|(key, asset)| (key.clone(), RawAssetRef::from(asset)))
                .collect(),
            excel_blob_path,
            excel_url,
            products: None,
        }
    }

    async fn read_document(&self, project_id: &str) -> ProjectResult<Option<ProjectDocument>> {
        let collection = &self.config.collection;
        let value = bounded(
            self.config.operation_timeout,
            format!("read document {}/{}", collection, project_id),
            self.documents.get(collection, project_id),
        )
        .await?;
        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn write_document(&self, project_id: &str, value: &serde_json::Value) -> ProjectResult<()> {
        let collection = &self.config.collection;
        bounded(
            self.config.operation_timeout,
            format!("write document {}/{}", collection, project_id),
            self.documents.set(collection, project_id, value),
        )
        .await
    }

    /// Lowercase keys and resolve every entry; corrupt entries are logged and dropped.
    fn normalize_mapping(
        &self,
        project_id: &str,
        raw: &BTreeMap<String, RawAssetRef>,
    ) -> ImageAssetMapping {
        let codec = self.blobs.codec();
        let mut mapping = ImageAssetMapping::new();
        for (key, reference) in raw {
            let key = normalize_product_id(key);
            if key.is_empty() {
                continue;
            }
            match reference.resolve(&key, codec) {
                Ok(asset) => {
                    if let Some(path) = asset.blob_path() {
                        if !is_project_path(project_id, path) {
                            debug!(key = %key, path = %path, "Asset stored outside project prefix");
                        }
                    }
                    mapping.insert(key, asset);
                }
                Err(e) => warn!(project_id = %project_id, error = %e, "Treating asset as missing"),
            }
        }
        mapping
    }
}

fn summary_of(doc: &ProjectDocument) -> ProjectSummary {
    ProjectSummary {
        id: doc.id.clone(),
        name: doc.name.clone(),
        description: doc.description.clone(),
        created_at: doc.created_date,
        last_modified_at: doc.last_modified.or(doc.created_date),
        product_count: doc.effective_product_count(),
        attribute_count: doc.attributes.len(),
        pending_change_count: doc.pending_changes.len(),
    }
}
