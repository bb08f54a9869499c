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

//! Image asset reconciliation.
//!
//! ## Flow
//! 1. [`AssetReconciler::reconcile`] (pure) compares the previous mapping with
//!    the new product list and produces a [`ReconcilePlan`].
//! 2. [`AssetReconciler::upload`] performs every upload concurrently. If any
//!    upload fails, blobs written by this call that the previous mapping does
//!    not reference are removed again and the error is returned.
//! 3. [`AssetReconciler::delete_orphans`] removes replaced and dropped blobs,
//!    best-effort. It is only ever called after all uploads succeeded.
//!
//! Blobs outside `projects/{id}/` may appear in a mapping (older documents
//! point at shared images) but are never queued for deletion.

use crate::asset::{AssetRef, ImageAssetMapping};
use crate::deadline::bounded;
use crate::layout::{image_path, is_project_path, validate_filename};
use crate::model::Product;
use crate::{ProjectError, ProjectResult};
use catalogvault_blob::BlobStore;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// One image to write.
#[derive(Clone)]
pub struct PlannedUpload {
    /// Lowercase product id
    pub key: String,
    pub blob_path: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl std::fmt::Debug for PlannedUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedUpload")
            .field("key", &self.key)
            .field("blob_path", &self.blob_path)
            .field("size", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Result of comparing the previous mapping with the new product list.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub uploads: Vec<PlannedUpload>,
    /// Entries kept without re-uploading
    pub carried: ImageAssetMapping,
    /// Paths to delete once uploads succeed
    pub deletions: Vec<String>,
    /// Blob paths referenced by the previous mapping
    pub previous_paths: BTreeSet<String>,
}

/// Outcome of a successful upload phase.
#[derive(Debug, Clone, Default)]
pub struct ReconciledAssets {
    /// Final mapping: carried entries plus fresh uploads
    pub mapping: ImageAssetMapping,
    /// Paths to delete
    pub deletions: Vec<String>,
    /// Paths written by this call that the previous mapping did not reference
    pub fresh: Vec<String>,
}

/// Computes and applies image asset diffs against a blob store.
pub struct AssetReconciler {
    blobs: Arc<dyn BlobStore>,
    timeout: Duration,
    default_content_type: String,
}

impl AssetReconciler {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        timeout: Duration,
        default_content_type: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            timeout,
            default_content_type: default_content_type.into(),
        }
    }

    /// Diff `old_mapping` (already normalized) against `products`.
    ///
    /// - a product with replacement bytes gets an upload; a previous entry at a
    ///   different path is queued for deletion
    /// - a product without bytes keeps its previous entry, or adopts its
    ///   embedded reference
    /// - previous entries whose product is gone are queued for deletion
    ///
    /// A path still referenced by the new mapping is never queued.
    pub fn reconcile(
        &self,
        project_id: &str,
        old_mapping: &ImageAssetMapping,
        products: &[Product],
    ) -> ProjectResult<ReconcilePlan> {
        let codec = self.blobs.codec();
        let mut uploads: BTreeMap<String, PlannedUpload> = BTreeMap::new();
        let mut carried = ImageAssetMapping::new();
        let mut present = BTreeSet::new();

        for product in products {
            let key = product.normalized_id();
            if key.is_empty() {
                warn!(project_id = %project_id, "Skipping product with empty id");
                continue;
            }
            present.insert(key.clone());

            if let Some(image) = &product.pending_image {
                validate_filename(&image.filename)?;
                let content_type = if image.content_type.is_empty() {
                    self.default_content_type.clone()
                } else {
                    image.content_type.clone()
                };
                carried.remove(&key);
                uploads.insert(
                    key.clone(),
                    PlannedUpload {
                        key,
                        blob_path: image_path(project_id, &image.filename),
                        bytes: image.bytes.clone(),
                        content_type,
                    },
                );
                continue;
            }

            if uploads.contains_key(&key) {
                continue;
            }
            if let Some(previous) = old_mapping.get(&key) {
                carried.insert(key, previous.clone());
            } else if let Some(adopted) = product
                .image_asset_ref
                .as_deref()
                .and_then(|url| AssetRef::LegacyUrl { url: url.to_string() }.normalize(codec))
            {
                carried.insert(key, adopted);
            }
        }

        let mut keep: BTreeSet<&str> = carried.values().filter_map(AssetRef::blob_path).collect();
        keep.extend(uploads.values().map(|u| u.blob_path.as_str()));

        let mut deletions = BTreeSet::new();
        for (key, previous) in old_mapping {
            let Some(path) = previous.blob_path() else {
                continue;
            };
            if !is_project_path(project_id, path) {
                continue;
            }
            let replaced = uploads.contains_key(key);
            let dropped = !present.contains(key);
            if (replaced || dropped) && !keep.contains(path) {
                deletions.insert(path.to_string());
            }
        }

        let previous_paths = old_mapping
            .values()
            .filter_map(AssetRef::blob_path)
            .map(str::to_string)
            .collect();

        debug!(
            project_id = %project_id,
            uploads = uploads.len(),
            carried = carried.len(),
            deletions = deletions.len(),
            "Asset reconciliation planned"
        );

        Ok(ReconcilePlan {
            uploads: uploads.into_values().collect(),
            carried,
            deletions: deletions.into_iter().collect(),
            previous_paths,
        })
    }

    /// Upload every planned image concurrently.
    #[instrument(skip(self, plan), fields(uploads = plan.uploads.len()))]
    pub async fn upload(&self, plan: ReconcilePlan) -> ProjectResult<ReconciledAssets> {
        let start = Instant::now();
        let ReconcilePlan {
            uploads,
            carried,
            deletions,
            previous_paths,
        } = plan;

        let attempts = uploads.into_iter().map(|upload| {
            let blobs = Arc::clone(&self.blobs);
            let timeout = self.timeout;
            async move {
                let PlannedUpload {
                    key,
                    blob_path,
                    bytes,
                    content_type,
                } = upload;
                let result = bounded(
                    timeout,
                    format!("upload {}", blob_path),
                    blobs.put(&blob_path, bytes, &content_type),
                )
                .await;
                (key, blob_path, result)
            }
        });
        let results = join_all(attempts).await;

        let mut mapping = carried;
        let mut fresh = Vec::new();
        let mut failure: Option<ProjectError> = None;
        for (key, blob_path, result) in results {
            let is_fresh = !previous_paths.contains(&blob_path);
            match result {
                Ok(url) => {
                    if is_fresh {
                        fresh.push(blob_path.clone());
                    }
                    mapping.insert(key, AssetRef::structured(blob_path, url));
                }
                Err(e) => {
                    warn!(path = %blob_path, error = %e, "Image upload failed");
                    // A timed-out put may still land later.
                    if is_fresh {
                        fresh.push(blob_path);
                    }
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            self.rollback(&fresh).await;
            return Err(e);
        }

        info!(
            duration_ms = start.elapsed().as_millis(),
            uploaded = fresh.len(),
            "Image uploads complete"
        );
        Ok(ReconciledAssets {
            mapping,
            deletions,
            fresh,
        })
    }

    /// Delete `paths`, logging and skipping failures. Returns the number deleted.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn delete_orphans(&self, paths: &[String]) -> usize {
        let attempts = paths.iter().map(|path| async move {
            let result = bounded(
                self.timeout,
                format!("delete {}", path),
                self.blobs.delete(path),
            )
            .await;
            if let Err(e) = &result {
                warn!(
                    path = %path,
                    uri = %self.blobs.codec().to_gs_uri(path),
                    error = %e,
                    "Failed to delete orphaned blob"
                );
            }
            result.is_ok()
        });
        let deleted = join_all(attempts).await.into_iter().filter(|ok| *ok).count();
        if deleted > 0 {
            info!(deleted, "Orphaned blobs deleted");
        }
        deleted
    }

    /// Remove blobs written by a save that did not complete.
    pub async fn rollback(&self, fresh: &[String]) {
        if fresh.is_empty() {
            return;
        }
        warn!(count = fresh.len(), "Rolling back uploads of failed save");
        self.delete_orphans(fresh).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PendingImage;
    use catalogvault_blob::ObjectStoreBlobStore;

    fn reconciler() -> AssetReconciler {
        AssetReconciler::new(
            Arc::new(ObjectStoreBlobStore::in_memory("bucket")),
            Duration::from_secs(5),
            "image/png",
        )
    }

    fn entry(path: &str) -> AssetRef {
        AssetRef::structured(path, format!("https://storage.googleapis.com/bucket/{}", path))
    }

    #[test]
    fn test_upload_key_is_lowercased() {
        let products = vec![Product::new(" ABC123 ", "Hat", "1.00")
            .with_image(PendingImage::new("ABC123.png", vec![1]))];
        let plan = reconciler().reconcile("p1", &ImageAssetMapping::new(), &products).unwrap();
        assert_eq!(plan.uploads.len(), 1);
        assert_eq!(plan.uploads[0].key, "abc123");
        assert_eq!(plan.uploads[0].blob_path, "projects/p1/images/ABC123.png");
        assert_eq!(plan.uploads[0].content_type, "image/png");
    }

    #[test]
    fn test_replacement_at_new_path_queues_old() {
        let old = ImageAssetMapping::from([("a".to_string(), entry("projects/p1/images/a1.png"))]);
        let products =
            vec![Product::new("A", "x", "").with_image(PendingImage::new("a2.png", vec![2]))];
        let plan = reconciler().reconcile("p1", &old, &products).unwrap();
        assert_eq!(plan.deletions, vec!["projects/p1/images/a1.png".to_string()]);
    }

    #[test]
    fn test_replacement_at_same_path_is_not_deleted() {
        let old = ImageAssetMapping::from([("a".to_string(), entry("projects/p1/images/a.png"))]);
        let products =
            vec![Product::new("a", "x", "").with_image(PendingImage::new("a.png", vec![2]))];
        let plan = reconciler().reconcile("p1", &old, &products).unwrap();
        assert!(plan.deletions.is_empty());
    }

    #[test]
    fn test_carry_forward_and_removed_product() {
        let old = ImageAssetMapping::from([
            ("a".to_string(), entry("projects/p1/images/a.png")),
            ("gone".to_string(), entry("projects/p1/images/gone.png")),
        ]);
        let products = vec![Product::new("A", "x", "")];
        let plan = reconciler().reconcile("p1", &old, &products).unwrap();
        assert!(plan.uploads.is_empty());
        assert_eq!(plan.carried.get("a"), old.get("a"));
        assert!(!plan.carried.contains_key("gone"));
        assert_eq!(plan.deletions, vec!["projects/p1/images/gone.png".to_string()]);
    }

    #[test]
    fn test_shared_path_is_kept() {
        // Two ids pointing at one blob; dropping one must not delete it.
        let old = ImageAssetMapping::from([
            ("a".to_string(), entry("projects/p1/images/shared.png")),
            ("b".to_string(), entry("projects/p1/images/shared.png")),
        ]);
        let products = vec![Product::new("a", "x", "")];
        let plan = reconciler().reconcile("p1", &old, &products).unwrap();
        assert!(plan.deletions.is_empty());
    }

    #[test]
    fn test_embedded_references_are_adopted() {
        let mut inside = Product::new("a", "x", "");
        inside.image_asset_ref = Some("gs://bucket/projects/p1/images/a.png".to_string());
        let mut outside = Product::new("b", "x", "");
        outside.image_asset_ref = Some(
            "https://storage.googleapis.com/bucket/projects/shared/images/b.png".to_string(),
        );
        let mut broken = Product::new("c", "x", "");
        broken.image_asset_ref = Some("http://elsewhere.example/c.png".to_string());

        let plan = reconciler()
            .reconcile("p1", &ImageAssetMapping::new(), &[inside, outside, broken])
            .unwrap();
        assert_eq!(
            plan.carried.get("a").and_then(AssetRef::blob_path),
            Some("projects/p1/images/a.png")
        );
        assert_eq!(
            plan.carried.get("b").and_then(AssetRef::blob_path),
            Some("projects/shared/images/b.png")
        );
        assert!(!plan.carried.contains_key("c"));
    }

    #[test]
    fn test_paths_outside_project_are_never_deleted() {
        let old = ImageAssetMapping::from([
            ("a".to_string(), entry("projects/shared/images/a.png")),
            ("gone".to_string(), entry("projects/shared/images/gone.png")),
        ]);
        let products =
            vec![Product::new("a", "x", "").with_image(PendingImage::new("a2.png", vec![2]))];
        let plan = reconciler().reconcile("p1", &old, &products).unwrap();
        assert_eq!(plan.uploads.len(), 1);
        assert!(plan.deletions.is_empty());
    }

    #[test]
    fn test_traversal_filename_rejected() {
        let products =
            vec![Product::new("a", "x", "").with_image(PendingImage::new("../a.png", vec![1]))];
        assert!(reconciler()
            .reconcile("p1", &ImageAssetMapping::new(), &products)
            .is_err());
    }
}
