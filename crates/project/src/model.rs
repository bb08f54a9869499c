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

//! In-memory project model.
//!
//! A [`Project`] is what collaborators build (usually from a parsed
//! spreadsheet) and hand to [`crate::ProjectStore::save_project`]. Products
//! whose image changed carry a transient [`PendingImage`]; everything else is
//! plain data.

use crate::{ProjectError, ProjectResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Attribute key to sorted distinct values.
pub type FilterOptions = BTreeMap<String, Vec<String>>;

/// Normalized product id to field name to new value.
pub type PendingChanges = BTreeMap<String, BTreeMap<String, String>>;

/// Field name for description edits.
pub const FIELD_DESCRIPTION: &str = "description";
/// Field name for price edits.
pub const FIELD_PRICE: &str = "price";

/// Lowercase and trim a product id before joining it against assets.
pub fn normalize_product_id(product_id: &str) -> String {
    product_id.trim().to_lowercase()
}

/// True if `filename`'s stem equals `product_id`, ignoring case.
///
/// ```rust
/// use catalogvault_project::image_filename_matches;
///
/// assert!(image_filename_matches("ABC123", "abc123.png"));
/// assert!(!image_filename_matches("ABC123", "abc1234.png"));
/// ```
pub fn image_filename_matches(product_id: &str, filename: &str) -> bool {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let product_id = normalize_product_id(product_id);
    !product_id.is_empty() && stem.trim().to_lowercase() == product_id
}

/// Content type inferred from a filename extension.
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename).extension()?.to_str()?.to_lowercase();
    Some(match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => return None,
    })
}

/// Attribute values observed across `products`, per attribute key.
///
/// Keys without any product value get an empty list so every configured
/// attribute is present.
pub fn filter_options_from(products: &[Product], attribute_keys: &[String]) -> FilterOptions {
    attribute_keys
        .iter()
        .map(|key| {
            let values: BTreeSet<&str> = products
                .iter()
                .filter_map(|p| p.attributes.get(key).map(String::as_str))
                .collect();
            (key.clone(), values.into_iter().map(str::to_string).collect())
        })
        .collect()
}

/// Replacement image bytes for one product. Never persisted inline.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingImage {
    /// Filename used as the blob name under `projects/{id}/images/`
    pub filename: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// MIME type, empty when unknown
    pub content_type: String,
}

impl PendingImage {
    /// New pending image; content type is inferred from the extension.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).unwrap_or_default().to_string();
        Self {
            filename,
            bytes,
            content_type,
        }
    }

    /// Override the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl std::fmt::Debug for PendingImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingImage")
            .field("filename", &self.filename)
            .field("size", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Case-insensitive identity
    #[serde(alias = "product_id", deserialize_with = "lenient_string")]
    pub product_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Decimal price as text, empty when unknown
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub distribution: BTreeMap<String, bool>,
    /// Display URL, resolved at load time
    #[serde(
        default,
        alias = "image_asset_ref",
        alias = "image_url",
        alias = "imageUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_asset_ref: Option<String>,
    #[serde(default, alias = "original_description", skip_serializing_if = "Option::is_none")]
    pub original_description: Option<String>,
    #[serde(default, alias = "original_price", skip_serializing_if = "Option::is_none")]
    pub original_price: Option<String>,
    #[serde(default, alias = "original_attributes", skip_serializing_if = "Option::is_none")]
    pub original_attributes: Option<BTreeMap<String, String>>,
    /// Row position in the source spreadsheet
    #[serde(default, alias = "original_index", skip_serializing_if = "Option::is_none")]
    pub original_index: Option<usize>,
    /// Replacement image, present only when the image changed
    #[serde(skip)]
    pub pending_image: Option<PendingImage>,
}

impl Product {
    /// New product; the current values become the baseline.
    pub fn new(
        product_id: impl Into<String>,
        description: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let price = price.into();
        Self {
            product_id: product_id.into(),
            original_description: Some(description.clone()),
            original_price: Some(price.clone()),
            original_attributes: Some(BTreeMap::new()),
            description,
            price,
            ..Self::default()
        }
    }

    /// Set an attribute value, also recording it as the baseline.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        self.original_attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.clone(), value.clone());
        self.attributes.insert(key, value);
        self
    }

    /// Set a distribution flag.
    pub fn with_distribution(mut self, key: impl Into<String>, flag: bool) -> Self {
        self.distribution.insert(key.into(), flag);
        self
    }

    /// Attach replacement image bytes.
    pub fn with_image(mut self, image: PendingImage) -> Self {
        self.pending_image = Some(image);
        self
    }

    /// Lowercase, trimmed id.
    pub fn normalized_id(&self) -> String {
        normalize_product_id(&self.product_id)
    }

    fn baseline_value(&self, field: &str) -> Option<String> {
        match field {
            FIELD_DESCRIPTION => self.original_description.clone(),
            FIELD_PRICE => self.original_price.clone(),
            key => self
                .original_attributes
                .as_ref()
                .and_then(|attrs| attrs.get(key).cloned()),
        }
    }

    fn current_value(&self, field: &str) -> Option<String> {
        match field {
            FIELD_DESCRIPTION => Some(self.description.clone()),
            FIELD_PRICE => Some(self.price.clone()),
            key => self.attributes.get(key).cloned(),
        }
    }

    fn capture_baseline(&mut self) {
        if self.original_description.is_none() {
            self.original_description = Some(self.description.clone());
        }
        if self.original_price.is_none() {
            self.original_price = Some(self.price.clone());
        }
        if self.original_attributes.is_none() {
            self.original_attributes = Some(self.attributes.clone());
        }
    }

    fn commit_baseline(&mut self) {
        self.original_description = Some(self.description.clone());
        self.original_price = Some(self.price.clone());
        self.original_attributes = Some(self.attributes.clone());
    }

    fn restore_baseline(&mut self) {
        if let Some(description) = &self.original_description {
            self.description = description.clone();
        }
        if let Some(price) = &self.original_price {
            self.price = price.clone();
        }
        if let Some(attributes) = &self.original_attributes {
            self.attributes = attributes.clone();
        }
    }
}

/// A product catalog with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Never goes backward across saves
    pub last_modified_at: DateTime<Utc>,
    /// Ordered attribute column labels
    pub attribute_keys: Vec<String>,
    /// Ordered distribution column labels
    pub distribution_keys: Vec<String>,
    pub filter_options: FilterOptions,
    pub pending_changes: PendingChanges,
    pub products: Vec<Product>,
    /// Filename of the source spreadsheet
    pub source_spreadsheet_name: Option<String>,
    /// Raw spreadsheet bytes, present only when a new snapshot should be stored
    pub spreadsheet_bytes: Option<Vec<u8>>,
}

impl Project {
    /// Empty project created now.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            created_at: now,
            last_modified_at: now,
            attribute_keys: Vec::new(),
            distribution_keys: Vec::new(),
            filter_options: FilterOptions::new(),
            pending_changes: PendingChanges::new(),
            products: Vec::new(),
            source_spreadsheet_name: None,
            spreadsheet_bytes: None,
        }
    }

    /// Replace the product list and recompute filter options.
    pub fn with_products(
        mut self,
        attribute_keys: Vec<String>,
        distribution_keys: Vec<String>,
        products: Vec<Product>,
    ) -> Self {
        self.filter_options = filter_options_from(&products, &attribute_keys);
        self.attribute_keys = attribute_keys;
        self.distribution_keys = distribution_keys;
        self.products = products;
        self
    }

    /// Attach a spreadsheet snapshot to upload on the next save.
    pub fn with_spreadsheet(mut self, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.source_spreadsheet_name = Some(filename.into());
        self.spreadsheet_bytes = Some(bytes);
        self
    }

    /// Find a product by case-insensitive id.
    pub fn product(&self, product_id: &str) -> Option<&Product> {
        let key = normalize_product_id(product_id);
        self.products.iter().find(|p| p.normalized_id() == key)
    }

    /// Number of products with staged edits.
    pub fn pending_change_count(&self) -> usize {
        self.pending_changes.len()
    }

    /// Edit one field of a product and record it as pending.
    ///
    /// `field` is `description`, `price` or an attribute key. Setting a field
    /// back to its baseline drops the pending entry.
    pub fn stage_change(
        &mut self,
        product_id: &str,
        field: &str,
        value: impl Into<String>,
    ) -> ProjectResult<()> {
        let key = normalize_product_id(product_id);
        let is_attribute = field != FIELD_DESCRIPTION && field != FIELD_PRICE;
        if is_attribute && !self.attribute_keys.iter().any(|k| k == field) {
            return Err(ProjectError::InvalidInput(format!(
                "unknown field '{}' for project {}",
                field, self.id
            )));
        }

        let product = self
            .products
            .iter_mut()
            .find(|p| p.normalized_id() == key)
            .ok_or_else(|| {
                ProjectError::InvalidInput(format!(
                    "unknown product '{}' in project {}",
                    product_id, self.id
                ))
            })?;

        product.capture_baseline();
        let value = value.into();
        match field {
            FIELD_DESCRIPTION => product.description = value.clone(),
            FIELD_PRICE => product.price = value.clone(),
            attribute => {
                product.attributes.insert(attribute.to_string(), value.clone());
            }
        }

        let unchanged = product.baseline_value(field).as_deref() == Some(value.as_str());
        let entry = self.pending_changes.entry(key.clone()).or_default();
        if unchanged {
            entry.remove(field);
        } else {
            entry.insert(field.to_string(), value);
        }
        if entry.is_empty() {
            self.pending_changes.remove(&key);
        }

        self.last_modified_at = Utc::now();
        Ok(())
    }

    /// Make staged edits the new baseline. Returns the number of products affected.
    pub fn apply_pending_changes(&mut self) -> usize {
        let mut applied = 0;
        for product in &mut self.products {
            let key = product.normalized_id();
            let index_key = product.original_index.map(|i| i.to_string());
            let staged = self.pending_changes.contains_key(&key)
                || index_key.is_some_and(|k| self.pending_changes.contains_key(&k));
            if staged {
                applied += 1;
            }
            product.commit_baseline();
        }
        self.pending_changes.clear();
        self.refresh_filter_options();
        self.last_modified_at = Utc::now();
        applied
    }

    /// Discard staged edits and restore every product's baseline.
    pub fn reset_pending_changes(&mut self) {
        for product in &mut self.products {
            product.restore_baseline();
        }
        self.pending_changes.clear();
        self.refresh_filter_options();
        self.last_modified_at = Utc::now();
    }

    /// Recompute filter options from current attribute values.
    pub fn refresh_filter_options(&mut self) {
        self.filter_options = filter_options_from(&self.products, &self.attribute_keys);
    }

    /// Current value of `field` on a product, if both exist.
    pub fn field_value(&self, product_id: &str, field: &str) -> Option<String> {
        self.product(product_id)?.current_value(field)
    }
}

/// Accept strings, numbers and null where text is expected.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
