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

//! Image asset references.
//!
//! Stored references have drifted across document versions:
//! - bare strings: `gs://bucket/path` or `https://host/bucket/path?v=...`
//! - records with only a URL (`{"publicUrl": ...}`)
//! - records with both (`{"blobPath": ..., "publicUrl": ...}`), the current form
//!
//! [`RawAssetRef`] accepts all of them without failing the surrounding
//! document; [`AssetRef::normalize`] turns any of them into the structured
//! form, which is the only form ever written back.

use crate::{ProjectError, ProjectResult};
use catalogvault_blob::BlobPathCodec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowercase product id to asset reference.
pub type ImageAssetMapping = BTreeMap<String, AssetRef>;

/// A product image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// Bucket-relative path plus display URL
    Structured { blob_path: String, url: String },
    /// URL only (legacy documents)
    LegacyUrl { url: String },
}

impl AssetRef {
    pub fn structured(blob_path: impl Into<String>, url: impl Into<String>) -> Self {
        AssetRef::Structured {
            blob_path: blob_path.into(),
            url: url.into(),
        }
    }

    /// Blob path, if known without resolving.
    pub fn blob_path(&self) -> Option<&str> {
        match self {
            AssetRef::Structured { blob_path, .. } => Some(blob_path),
            AssetRef::LegacyUrl { .. } => None,
        }
    }

    /// Stored URL as-is.
    pub fn url(&self) -> &str {
        match self {
            AssetRef::Structured { url, .. } | AssetRef::LegacyUrl { url } => url,
        }
    }

    /// Resolve to the structured form with an HTTPS display URL.
    ///
    /// Returns `None` when the reference does not point into the codec's bucket.
    pub fn normalize(&self, codec: &BlobPathCodec) -> Option<AssetRef> {
        match self {
            AssetRef::Structured { blob_path, url } => {
                // Older writers sometimes stored a URI in the path slot.
                let path = if blob_path.contains("://") {
                    codec.to_path(blob_path)?
                } else {
                    blob_path.trim_start_matches('/').to_string()
                };
                if path.is_empty() {
                    return None;
                }
                let url = match codec.to_path(url) {
                    Some(resolved) if resolved == path => codec.to_display_url(url)?,
                    _ => codec.to_url(&path),
                };
                Some(AssetRef::Structured {
                    blob_path: path,
                    url,
                })
            }
            AssetRef::LegacyUrl { url } => Some(AssetRef::Structured {
                blob_path: codec.to_path(url)?,
                url: codec.to_display_url(url)?,
            }),
        }
    }
}

/// Current on-disk record shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAssetRef {
    #[serde(default, alias = "blob_path", skip_serializing_if = "Option::is_none")]
    pub blob_path: Option<String>,
    #[serde(
        default,
        alias = "public_url",
        alias = "url",
        alias = "displayUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_url: Option<String>,
}

/// Any stored reference shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAssetRef {
    Url(String),
    Record(StoredAssetRef),
    /// Unrecognized shape, kept so one bad entry does not fail the document
    Other(serde_json::Value),
}

impl RawAssetRef {
    /// Interpret without resolving against a bucket.
    pub fn to_asset_ref(&self) -> Option<AssetRef> {
        match self {
            RawAssetRef::Url(url) if !url.trim().is_empty() => Some(AssetRef::LegacyUrl {
                url: url.trim().to_string(),
            }),
            RawAssetRef::Record(StoredAssetRef {
                blob_path: Some(path),
                public_url,
            }) if !path.trim().is_empty() => Some(AssetRef::Structured {
                blob_path: path.trim().to_string(),
                url: public_url.clone().unwrap_or_default(),
            }),
            RawAssetRef::Record(StoredAssetRef {
                public_url: Some(url),
                ..
            }) if !url.trim().is_empty() => Some(AssetRef::LegacyUrl {
                url: url.trim().to_string(),
            }),
            _ => None,
        }
    }

    /// Resolve into the structured form, or report the entry as corrupt.
    pub fn resolve(&self, key: &str, codec: &BlobPathCodec) -> ProjectResult<AssetRef> {
        self.to_asset_ref()
            .and_then(|asset| asset.normalize(codec))
            .ok_or_else(|| ProjectError::CorruptReference {
                key: key.to_string(),
                reference: self.describe(),
            })
    }

    fn describe(&self) -> String {
        match self {
            RawAssetRef::Url(url) => url.clone(),
            other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
        }
    }
}

impl From<&AssetRef> for RawAssetRef {
    fn from(asset: &AssetRef) -> Self {
        match asset {
            AssetRef::Structured { blob_path, url } => RawAssetRef::Record(StoredAssetRef {
                blob_path: Some(blob_path.clone()),
                public_url: Some(url.clone()),
            }),
            AssetRef::LegacyUrl { url } => RawAssetRef::Url(url.clone()),
        }
    }
}
