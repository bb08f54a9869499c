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

//! End-to-end persistence properties.
//!
//! Each test exercises `ProjectStore` through the public API over in-memory
//! backends, with fault injection from `common::FaultyBlobStore`.

mod common;

use catalogvault::{
    image_filename_matches, AssetRef, BlobStore, DocumentError, DocumentStore, PendingImage,
    Product, Project, ProjectError,
};
use common::{catalog, harness, harness_with_document_limit};
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;

fn mapped_paths(mapping: &catalogvault::ImageAssetMapping) -> BTreeSet<String> {
    mapping
        .values()
        .filter_map(AssetRef::blob_path)
        .map(str::to_string)
        .collect()
}

async fn stored_image_paths(blobs: &common::FaultyBlobStore, project_id: &str) -> BTreeSet<String> {
    blobs
        .list_by_prefix(&format!("projects/{}/images", project_id))
        .await
        .unwrap()
        .into_iter()
        .collect()
}

#[tokio::test]
async fn test_reload_and_resave_is_idempotent() {
    let h = harness();
    let first_mapping = h.store.save_project("p1", &catalog("p1", "abc123.png")).await.unwrap();
    let first_doc = h.documents.get("projects", "p1").await.unwrap().unwrap();

    let mut current = h.store.load_project("p1").await.unwrap().unwrap();
    for _ in 0..3 {
        let mapping = h.store.save_project("p1", &current.project).await.unwrap();
        assert_eq!(mapping, first_mapping);

        let reloaded = h.store.load_project("p1").await.unwrap().unwrap();
        assert_eq!(reloaded.asset_mapping, current.asset_mapping);
        assert_eq!(reloaded.project.products, current.project.products);
        current = reloaded;
    }

    let doc = h.documents.get("projects", "p1").await.unwrap().unwrap();
    assert_eq!(doc["productCount"], first_doc["productCount"]);
    assert_eq!(doc["imageAssetMapping"], first_doc["imageAssetMapping"]);
    assert_eq!(
        stored_image_paths(&h.blobs, "p1").await,
        mapped_paths(&first_mapping)
    );
}

#[tokio::test]
async fn test_no_orphaned_blobs_after_repeated_replacements() {
    let h = harness();
    for round in 0..6 {
        let mut project = catalog("p1", &format!("abc123-v{}.png", round));
        project.products[1] = project.products[1]
            .clone()
            .with_image(PendingImage::new(format!("xyz9-{}.jpg", round), vec![round as u8]));

        let mapping = h.store.save_project("p1", &project).await.unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(stored_image_paths(&h.blobs, "p1").await, mapped_paths(&mapping));
    }

    // Drop a product entirely: its image goes too.
    let mut project = h.store.load_project("p1").await.unwrap().unwrap().project;
    project.products.retain(|p| p.normalized_id() != "xyz9");
    let mapping = h.store.save_project("p1", &project).await.unwrap();
    assert_eq!(
        stored_image_paths(&h.blobs, "p1").await,
        BTreeSet::from(["projects/p1/images/abc123-v5.png".to_string()])
    );
    assert_eq!(mapped_paths(&mapping).len(), 1);
}

#[tokio::test]
async fn test_failed_replacement_keeps_previous_assets() {
    let h = harness();
    h.store.save_project("p1", &catalog("p1", "abc123-old.png")).await.unwrap();
    let before = h.documents.get("projects", "p1").await.unwrap().unwrap();

    h.blobs.fail_puts_to("abc123-new.png");
    let mut project = catalog("p1", "abc123-new.png");
    project.products[1] = project.products[1]
        .clone()
        .with_image(PendingImage::new("xyz9.png", vec![9]));

    let err = h.store.save_project("p1", &project).await.unwrap_err();
    assert!(matches!(err, ProjectError::Blob(_)));
    assert!(err.is_transient());

    // Old image intact, the sibling upload rolled back, document untouched.
    assert_eq!(
        stored_image_paths(&h.blobs, "p1").await,
        BTreeSet::from(["projects/p1/images/abc123-old.png".to_string()])
    );
    assert_eq!(h.documents.get("projects", "p1").await.unwrap().unwrap(), before);

    let view = h.store.load_project("p1").await.unwrap().unwrap();
    let url = view.project.product("abc123").unwrap().image_asset_ref.clone().unwrap();
    assert!(url.contains("/projects/p1/images/abc123-old.png"));
    assert_eq!(
        h.blobs.get("projects/p1/images/abc123-old.png").await.unwrap(),
        Some(b"abc123-old.png".to_vec())
    );
}

#[tokio::test]
async fn test_oversized_document_leaves_previous_save_intact() {
    let h = harness_with_document_limit(4096);
    h.store.save_project("p1", &catalog("p1", "abc123-v1.png")).await.unwrap();
    let before = h.documents.get("projects", "p1").await.unwrap().unwrap();

    // Sixty new mapping entries push the document over the limit.
    let mut project = catalog("p1", "abc123-v2.png");
    for i in 0..60 {
        project.products.push(
            Product::new(format!("EXTRA-{:03}", i), "Extra", "1.00")
                .with_image(PendingImage::new(format!("extra-{:03}.png", i), vec![i as u8])),
        );
    }
    let err = h.store.save_project("p1", &project).await.unwrap_err();
    assert!(
        matches!(err, ProjectError::Document(DocumentError::DocumentTooLarge { .. })),
        "{:?}",
        err
    );

    assert_eq!(h.documents.get("projects", "p1").await.unwrap().unwrap(), before);
    assert_eq!(
        stored_image_paths(&h.blobs, "p1").await,
        BTreeSet::from(["projects/p1/images/abc123-v1.png".to_string()])
    );
    let view = h.store.load_project("p1").await.unwrap().unwrap();
    assert_eq!(view.project.products.len(), 2);
    assert_eq!(before["productCount"], 2);
    let url = view.project.product("abc123").unwrap().image_asset_ref.clone().unwrap();
    assert!(url.contains("/projects/p1/images/abc123-v1.png"));
}

#[tokio::test]
async fn test_failed_document_write_restores_previous_payload() {
    let h = harness();
    h.store.save_project("p1", &catalog("p1", "abc123-v1.png")).await.unwrap();
    let before = h.documents.get("projects", "p1").await.unwrap().unwrap();

    h.documents.fail_writes(true);
    let mut project = catalog("p1", "abc123-v2.png");
    project.products.push(Product::new("NEW1", "Sun visor", "3.00"));
    let err = h.store.save_project("p1", &project).await.unwrap_err();
    assert!(matches!(err, ProjectError::Document(DocumentError::StorageError(_))));
    assert!(err.is_transient());
    h.documents.fail_writes(false);

    assert_eq!(h.documents.get("projects", "p1").await.unwrap().unwrap(), before);
    assert_eq!(
        stored_image_paths(&h.blobs, "p1").await,
        BTreeSet::from(["projects/p1/images/abc123-v1.png".to_string()])
    );
    let view = h.store.load_project("p1").await.unwrap().unwrap();
    assert_eq!(view.project.products.len(), 2);
    assert!(view.project.product("new1").is_none());
}

#[tokio::test]
async fn test_failed_first_save_leaves_no_blobs() {
    let h = harness();
    h.documents.fail_writes(true);

    assert!(h.store.save_project("p1", &catalog("p1", "abc123.png")).await.is_err());
    assert!(h.blobs.list_by_prefix("projects/p1").await.unwrap().is_empty());
    assert!(h.store.load_project("p1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_orphan_deletion_does_not_fail_save() {
    let h = harness();
    h.store.save_project("p1", &catalog("p1", "abc123-v1.png")).await.unwrap();
    h.blobs.fail_deletes_to("abc123-v1.png");

    let mapping = h.store.save_project("p1", &catalog("p1", "abc123-v2.png")).await.unwrap();
    assert_eq!(
        mapping["abc123"].blob_path(),
        Some("projects/p1/images/abc123-v2.png")
    );

    // The stale blob lingers; the document only knows the new one.
    assert_eq!(
        stored_image_paths(&h.blobs, "p1").await,
        BTreeSet::from([
            "projects/p1/images/abc123-v1.png".to_string(),
            "projects/p1/images/abc123-v2.png".to_string(),
        ])
    );
    let doc = h.documents.get("projects", "p1").await.unwrap().unwrap();
    assert_eq!(
        doc["imageAssetMapping"]["abc123"]["blobPath"],
        "projects/p1/images/abc123-v2.png"
    );
}

#[tokio::test]
async fn test_delete_continues_past_failed_blob_deletes() {
    let h = harness();
    h.store.save_project("p1", &catalog("p1", "abc123.png")).await.unwrap();
    h.blobs.fail_deletes_to("products_data.json");

    h.store.delete_project("p1").await.unwrap();

    assert!(h.documents.get("projects", "p1").await.unwrap().is_none());
    assert_eq!(
        h.blobs.list_by_prefix("projects/p1").await.unwrap(),
        vec!["projects/p1/products_data.json".to_string()]
    );
}

#[tokio::test]
async fn test_embedded_reference_outside_project_survives_resave() {
    let h = harness();
    h.blobs
        .put("projects/shared/images/a.png", vec![7], "image/png")
        .await
        .unwrap();
    h.documents
        .set(
            "projects",
            "p1",
            &json!({
                "id": "p1",
                "name": "Imported",
                "products_data": [
                    { "product_id": "ABC123", "description": "Hat", "price": "1.00",
                      "image_url": "gs://catalog-bucket/projects/shared/images/a.png" },
                    { "product_id": "XYZ9", "description": "Scarf", "price": "2.00" }
                ]
            }),
        )
        .await
        .unwrap();
    let shared_url = "https://storage.googleapis.com/catalog-bucket/projects/shared/images/a.png";

    let view = h.store.load_project("p1").await.unwrap().unwrap();
    assert_eq!(
        view.project.product("abc123").unwrap().image_asset_ref.as_deref(),
        Some(shared_url)
    );

    let mapping = h.store.save_project("p1", &view.project).await.unwrap();
    assert_eq!(mapping["abc123"].blob_path(), Some("projects/shared/images/a.png"));
    let reloaded = h.store.load_project("p1").await.unwrap().unwrap();
    assert_eq!(
        reloaded.project.product("abc123").unwrap().image_asset_ref.as_deref(),
        Some(shared_url)
    );

    // The project never owned the shared blob: dropping the product or the
    // whole project leaves it in place.
    let mut dropped = reloaded.project.clone();
    dropped.products.retain(|p| p.normalized_id() != "abc123");
    h.store.save_project("p1", &dropped).await.unwrap();
    assert_eq!(
        h.blobs.get("projects/shared/images/a.png").await.unwrap(),
        Some(vec![7])
    );

    h.store.save_project("p1", &reloaded.project).await.unwrap();
    h.store.delete_project("p1").await.unwrap();
    assert_eq!(
        h.blobs.get("projects/shared/images/a.png").await.unwrap(),
        Some(vec![7])
    );
}

#[tokio::test]
async fn test_asset_join_is_case_insensitive() {
    let h = harness();
    let uploads = [("abc123.PNG", vec![1u8]), ("Xyz9.jpg", vec![2u8])];
    let mut project = catalog("p1", "unused.png");
    for product in &mut project.products {
        let (name, bytes) = uploads
            .iter()
            .find(|(name, _)| image_filename_matches(&product.product_id, name))
            .unwrap();
        product.pending_image = Some(PendingImage::new(*name, bytes.clone()));
    }

    let mapping = h.store.save_project("p1", &project).await.unwrap();
    assert_eq!(
        mapping.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["abc123", "xyz9"]
    );

    let view = h.store.load_project("p1").await.unwrap().unwrap();
    for id in ["ABC123", "abc123", " Abc123 ", "XYZ9"] {
        assert!(view.project.product(id).unwrap().image_asset_ref.is_some(), "{}", id);
    }

    // A document whose keys kept the original casing joins the same way.
    h.documents
        .set(
            "projects",
            "p2",
            &json!({
                "id": "p2",
                "products_data": [{ "product_id": "abc123" }],
                "image_mappings": {
                    "ABC123": { "blobPath": "projects/p2/images/ABC123.png" }
                }
            }),
        )
        .await
        .unwrap();
    let legacy = h.store.load_project("p2").await.unwrap().unwrap();
    assert_eq!(
        legacy.project.products[0].image_asset_ref.as_deref(),
        Some("https://storage.googleapis.com/catalog-bucket/projects/p2/images/ABC123.png")
    );
}

#[tokio::test]
async fn test_large_catalog_is_offloaded_transparently() {
    let h = harness();
    let products: Vec<Product> = (0..10_000)
        .map(|i| {
            Product::new(
                format!("SKU-{:05}", i),
                format!("Catalog item number {} with a reasonably long description", i),
                format!("{}.{:02}", i % 500, i % 100),
            )
            .with_attribute("ATT Color", ["Red", "Green", "Blue"][i % 3])
            .with_attribute("ATT Size", ["S", "M", "L", "XL"][i % 4])
            .with_distribution("DIST Online", i % 2 == 0)
        })
        .collect();
    let project = Project::new("big", "Big Catalog").with_products(
        vec!["ATT Color".to_string(), "ATT Size".to_string()],
        vec!["DIST Online".to_string()],
        products,
    );

    h.store.save_project("big", &project).await.unwrap();

    let doc = h.documents.get("projects", "big").await.unwrap().unwrap();
    assert_eq!(doc["productCount"], 10_000);
    assert!(doc.get("products").is_none());
    assert!(doc.get("products_data").is_none());
    assert!(serde_json::to_vec(&doc).unwrap().len() < 64 * 1024);

    let view = h.store.load_project("big").await.unwrap().unwrap();
    assert_eq!(view.project.products, project.products);
    assert_eq!(view.project.filter_options, project.filter_options);
    assert_eq!(
        view.project.filter_options["ATT Size"],
        vec!["L", "M", "S", "XL"]
    );
}

#[tokio::test]
async fn test_legacy_references_load_as_https_and_heal_on_save() {
    let h = harness();
    h.documents
        .set(
            "projects",
            "p1",
            &json!({
                "id": "p1",
                "name": "Imported",
                "created_date": "2024-01-05T09:30:00.000001",
                "last_modified": "2024-01-06T09:30:00",
                "attributes": ["ATT Color"],
                "distributions": [],
                "pending_changes": {},
                "excel_filename": "imported.xlsx",
                "products_data": [
                    { "product_id": "ABC123", "description": "Hat", "price": "1.00",
                      "attributes": { "ATT Color": "Red" },
                      "image_url": "gs://catalog-bucket/projects/p1/images/ABC123.png" },
                    { "product_id": "XYZ9", "description": "Scarf", "price": "2.00",
                      "attributes": { "ATT Color": "Blue" } }
                ],
                "image_mappings": {
                    "ABC123": "gs://catalog-bucket/projects/p1/images/ABC123.png",
                    "XYZ9": "https://storage.googleapis.com/catalog-bucket/projects/p1/images/XYZ9%20v2.png?v=17"
                }
            }),
        )
        .await
        .unwrap();

    let view = h.store.load_project("p1").await.unwrap().unwrap();
    assert_eq!(
        view.project.product("abc123").unwrap().image_asset_ref.as_deref(),
        Some("https://storage.googleapis.com/catalog-bucket/projects/p1/images/ABC123.png")
    );
    assert_eq!(
        view.project.product("xyz9").unwrap().image_asset_ref.as_deref(),
        Some("https://storage.googleapis.com/catalog-bucket/projects/p1/images/XYZ9%20v2.png?v=17")
    );
    assert_eq!(
        view.project.filter_options["ATT Color"],
        vec!["Blue", "Red"]
    );
    for product in &view.project.products {
        assert!(!product.image_asset_ref.as_deref().unwrap_or("").starts_with("gs://"));
    }

    h.store.save_project("p1", &view.project).await.unwrap();
    let healed = h.documents.get("projects", "p1").await.unwrap().unwrap();
    assert!(healed.get("products_data").is_none());
    assert!(healed.get("image_mappings").is_none());
    assert_eq!(healed["productCount"], 2);
    assert_eq!(healed["payloadBlobPath"], "projects/p1/products_data.json");
    assert_eq!(
        healed["imageAssetMapping"]["xyz9"],
        json!({
            "blobPath": "projects/p1/images/XYZ9 v2.png",
            "publicUrl": "https://storage.googleapis.com/catalog-bucket/projects/p1/images/XYZ9%20v2.png?v=17"
        })
    );
    assert_eq!(
        healed["imageAssetMapping"]["abc123"]["publicUrl"],
        "https://storage.googleapis.com/catalog-bucket/projects/p1/images/ABC123.png"
    );
    assert!(healed["createdDate"].as_str().unwrap().starts_with("2024-01-05T09:30:00"));
}

#[tokio::test]
async fn test_concurrent_saves_are_debounced() {
    let h = harness();
    h.blobs.delay_puts(Duration::from_millis(150));
    let project = catalog("p1", "abc123.png");

    let (first, second) = tokio::join!(
        h.store.save_project("p1", &project),
        h.store.save_project("p1", &project)
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let rejected = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(rejected, ProjectError::ConcurrentSaveRejected(id) if id == "p1"));
    assert!(rejected.is_concurrent_save());

    // One image and one payload, from the winning save only.
    assert_eq!(h.blobs.put_count(), 2);

    // The guard is free again once the winner finishes.
    h.blobs.delay_puts(Duration::from_millis(0));
    h.store.save_project("p1", &project).await.unwrap();
}

#[tokio::test]
async fn test_saves_of_different_projects_do_not_block_each_other() {
    let h = harness();
    h.blobs.delay_puts(Duration::from_millis(50));
    let a = catalog("a", "abc123.png");
    let b = catalog("b", "abc123.png");

    let (first, second) = tokio::join!(h.store.save_project("a", &a), h.store.save_project("b", &b));
    first.unwrap();
    second.unwrap();
}

#[tokio::test]
async fn test_listing_summaries_never_reads_payloads() {
    let h = harness();
    h.store.save_project("p1", &catalog("p1", "a.png")).await.unwrap();
    h.store.save_project("p2", &catalog("p2", "b.png")).await.unwrap();
    h.blobs.forbid_reads_of("products_data.json");

    let summaries = h.store.list_project_summaries().await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|s| s.product_count == 2 && s.attribute_count == 2));
    assert!(h.blobs.reads().is_empty());

    // Loading does need the payload, so the injected fault surfaces there.
    assert!(h.store.load_project("p1").await.is_err());
}
