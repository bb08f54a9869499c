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

//! End-to-end connectivity check against the configured backends.

use anyhow::{ensure, Context, Result};
use catalogvault_blob::BlobStore;
use catalogvault_project::{PendingImage, Product, Project, ProjectStore};
use std::time::Instant;

// 1x1 transparent PNG
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Save a throwaway project, read it back, then delete it.
pub async fn run(store: &ProjectStore) -> Result<()> {
    let start = Instant::now();
    let id = format!("smoke-{}", ulid::Ulid::new().to_string().to_lowercase());
    println!("🔌 Running smoke test with project {}", id);

    let mut project = Project::new(&id, "Smoke Test").with_products(
        vec!["ATT Color".to_string()],
        vec!["DIST Online".to_string()],
        vec![Product::new("SMOKE-1", "Connectivity check", "0.00")
            .with_attribute("ATT Color", "Clear")
            .with_distribution("DIST Online", true)
            .with_image(PendingImage::new("smoke-1.png", PIXEL_PNG.to_vec()))],
    );
    project.description = format!("Created by catalogvault smoke-test at {}", chrono::Utc::now());

    let outcome = exercise(store, &id, &project).await;

    // Clean up even when a check failed.
    let cleanup = store.delete_project(&id).await;
    outcome?;
    cleanup.with_context(|| format!("Failed to delete smoke test project {}", id))?;
    ensure!(
        store.load_project(&id).await?.is_none(),
        "project {} still present after delete",
        id
    );

    tracing::info!(duration_ms = start.elapsed().as_millis(), "Smoke test passed");
    println!("✅ Smoke test passed in {} ms", start.elapsed().as_millis());
    Ok(())
}

async fn exercise(store: &ProjectStore, id: &str, project: &Project) -> Result<()> {
    let mapping = store
        .save_project(id, project)
        .await
        .context("Failed to save smoke test project")?;
    ensure!(mapping.contains_key("smoke-1"), "image mapping missing smoke-1");
    println!("  saved ({} image)", mapping.len());

    let view = store
        .load_project(id)
        .await
        .context("Failed to load smoke test project")?
        .context("Smoke test project missing after save")?;
    ensure!(view.project.products.len() == 1, "expected one product after load");
    let blob_path = mapping["smoke-1"]
        .blob_path()
        .context("Image mapping has no blob path")?;
    let stored = store
        .blobs()
        .get(blob_path)
        .await
        .with_context(|| format!("Failed to read {}", blob_path))?;
    ensure!(
        stored.as_deref() == Some(PIXEL_PNG),
        "stored image at {} does not match upload",
        blob_path
    );
    let url = view.project.products[0]
        .image_asset_ref
        .clone()
        .context("Loaded product has no image URL")?;
    ensure!(url.starts_with("https://"), "image URL is not https: {}", url);
    println!("  loaded, image at {}", url);

    let listed = store
        .list_project_summaries()
        .await
        .context("Failed to list projects")?;
    ensure!(
        listed.iter().any(|s| s.id == id && s.product_count == 1),
        "smoke test project missing from listing"
    );
    println!("  listed among {} project(s)", listed.len());
    Ok(())
}
