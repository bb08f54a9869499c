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

//! Project inspection commands.

use anyhow::{bail, Context, Result};
use catalogvault_blob::BlobStore;
use catalogvault_project::layout::validate_filename;
use catalogvault_project::{AssetRef, ProjectStore};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Print project summaries.
pub async fn list(store: &ProjectStore, as_json: bool) -> Result<()> {
    let summaries = store
        .list_project_summaries()
        .await
        .context("Failed to list projects")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No projects found in collection '{}'", store.config().collection);
        return Ok(());
    }

    println!(
        "{:<28} {:<32} {:>8} {:>6} {:>8}  {}",
        "ID", "NAME", "PRODUCTS", "ATTRS", "PENDING", "LAST MODIFIED"
    );
    for summary in summaries {
        let modified = summary
            .last_modified_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<32} {:>8} {:>6} {:>8}  {}",
            summary.id,
            summary.name,
            summary.product_count,
            summary.attribute_count,
            summary.pending_change_count,
            modified
        );
    }
    Ok(())
}

/// Print one project as JSON.
pub async fn show(store: &ProjectStore, id: &str, with_products: bool) -> Result<()> {
    let Some(view) = store
        .load_project(id)
        .await
        .with_context(|| format!("Failed to load project {}", id))?
    else {
        bail!("Project not found: {}", id);
    };

    let codec = store.blobs().codec();
    let images: serde_json::Map<String, serde_json::Value> = view
        .asset_mapping
        .iter()
        .map(|(key, asset)| {
            let entry = match asset {
                AssetRef::Structured { blob_path, url } => json!({
                    "blobPath": blob_path,
                    "gsUri": codec.to_gs_uri(blob_path),
                    "url": url,
                }),
                AssetRef::LegacyUrl { url } => json!({ "url": url }),
            };
            (key.clone(), entry)
        })
        .collect();

    let project = &view.project;
    let mut output = json!({
        "id": project.id,
        "name": project.name,
        "description": project.description,
        "createdAt": project.created_at,
        "lastModifiedAt": project.last_modified_at,
        "attributes": project.attribute_keys,
        "distributions": project.distribution_keys,
        "productCount": project.products.len(),
        "pendingChanges": project.pending_changes,
        "payloadBlobPath": view.payload_blob_path,
        "spreadsheet": {
            "filename": project.source_spreadsheet_name,
            "blobPath": view.spreadsheet_blob_path,
            "url": view.spreadsheet_url,
        },
        "images": images,
    });
    if with_products {
        output["products"] = serde_json::to_value(&project.products)?;
        output["filterOptions"] = serde_json::to_value(&project.filter_options)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Delete a project and report.
pub async fn delete(store: &ProjectStore, id: &str) -> Result<()> {
    store
        .delete_project(id)
        .await
        .with_context(|| format!("Failed to delete project {}", id))?;
    println!("🗑️  Deleted project {}", id);
    Ok(())
}

/// Write the stored spreadsheet to `out`, or to its stored filename.
pub async fn export_spreadsheet(store: &ProjectStore, id: &str, out: Option<&Path>) -> Result<()> {
    let Some((filename, bytes)) = store
        .load_spreadsheet(id)
        .await
        .with_context(|| format!("Failed to load spreadsheet of project {}", id))?
    else {
        bail!("Project {} has no stored spreadsheet", id);
    };

    let target = export_target(&filename, out)?;
    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    tracing::info!(project_id = %id, path = %target.display(), size = bytes.len(), "Spreadsheet exported");
    println!("📥 Wrote {} ({} bytes) to {}", filename, bytes.len(), target.display());
    Ok(())
}

/// `out` if given, else the stored filename when it is a single plain segment.
fn export_target(filename: &str, out: Option<&Path>) -> Result<PathBuf> {
    if let Some(out) = out {
        return Ok(out.to_path_buf());
    }
    validate_filename(filename).with_context(|| {
        format!(
            "Stored spreadsheet name {:?} is not a plain filename, give an output path",
            filename
        )
    })?;
    Ok(PathBuf::from(filename))
}
