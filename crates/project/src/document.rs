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

//! Lightweight project document schema.
//!
//! Written in camelCase. Reads also accept the snake_case field names and the
//! inline `products_data` list of older documents, and timestamps written as
//! naive ISO-8601 strings without an offset (taken as UTC).

use crate::asset::RawAssetRef;
use crate::model::{FilterOptions, PendingChanges, Product};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The document stored in the `projects` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        alias = "created_date",
        alias = "createdAt",
        with = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "last_modified",
        with = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub distributions: Vec<String>,
    /// Only in legacy documents; current ones keep it in the payload
    #[serde(default, alias = "filter_options", skip_serializing_if = "Option::is_none")]
    pub filter_options: Option<FilterOptions>,
    #[serde(default, alias = "pending_changes", with = "pending")]
    pub pending_changes: PendingChanges,
    #[serde(default, alias = "excel_filename", skip_serializing_if = "Option::is_none")]
    pub excel_filename: Option<String>,
    #[serde(default, alias = "product_count", skip_serializing_if = "Option::is_none")]
    pub product_count: Option<usize>,
    #[serde(default, alias = "payload_blob_path", skip_serializing_if = "Option::is_none")]
    pub payload_blob_path: Option<String>,
    #[serde(default, alias = "image_asset_mapping", alias = "image_mappings")]
    pub image_asset_mapping: BTreeMap<String, RawAssetRef>,
    #[serde(default, alias = "excel_blob_path", skip_serializing_if = "Option::is_none")]
    pub excel_blob_path: Option<String>,
    #[serde(default, alias = "excel_url", skip_serializing_if = "Option::is_none")]
    pub excel_url: Option<String>,
    /// Inline product list of documents written before offloading
    #[serde(default, alias = "products_data", skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
}

impl ProjectDocument {
    /// Product count, falling back to the inline list.
    pub fn effective_product_count(&self) -> usize {
        self.product_count
            .or_else(|| self.products.as_ref().map(Vec::len))
            .unwrap_or(0)
    }
}

/// RFC 3339 on write; RFC 3339 or naive ISO-8601 on read.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => parse(&s),
            Some(serde_json::Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        })
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}

/// Pending change values are text; older documents sometimes stored numbers.
mod pending {
    use crate::model::PendingChanges;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;
    use std::collections::BTreeMap;

    pub fn serialize<S>(value: &PendingChanges, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PendingChanges, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, BTreeMap<String, Value>>>::deserialize(deserializer)?
            .unwrap_or_default();
        Ok(raw
            .into_iter()
            .map(|(key, fields)| {
                let fields = fields
                    .into_iter()
                    .map(|(field, value)| {
                        let text = match value {
                            Value::String(s) => s,
                            Value::Null => String::new(),
                            other => other.to_string(),
                        };
                        (field, text)
                    })
                    .collect();
                (key, fields)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_document_shape() {
        let doc: ProjectDocument = serde_json::from_value(json!({
            "id": "p1",
            "name": "Spring",
            "description": "",
            "created_date": "2024-03-01T10:15:30.123456",
            "last_modified": "2024-03-02T08:00:00",
            "attributes": ["ATT Color"],
            "distributions": [],
            "filter_options": { "ATT Color": ["Red"] },
            "pending_changes": { "3": { "price": 9.5 } },
            "excel_filename": "spring.xlsx",
            "user_id": "anonymous",
            "products_data": [
                { "product_id": "ABC123", "description": "Hat", "price": "10.00",
                  "attributes": { "ATT Color": "Red" }, "distribution": {} }
            ],
            "image_mappings": { "ABC123": "gs://b/projects/p1/images/ABC123.png" }
        }))
        .unwrap();

        assert_eq!(doc.effective_product_count(), 1);
        assert_eq!(doc.excel_filename.as_deref(), Some("spring.xlsx"));
        assert_eq!(doc.pending_changes["3"]["price"], "9.5");
        assert_eq!(
            doc.created_date.map(|ts| ts.to_rfc3339()),
            Some("2024-03-01T10:15:30.123456+00:00".to_string())
        );
        assert!(matches!(
            doc.image_asset_mapping.get("ABC123"),
            Some(RawAssetRef::Url(_))
        ));
    }

    #[test]
    fn test_written_document_has_no_inline_products() {
        let doc = ProjectDocument {
            id: "p1".to_string(),
            product_count: Some(3),
            payload_blob_path: Some("projects/p1/products_data.json".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("products").is_none());
        assert!(value.get("filterOptions").is_none());
        assert_eq!(value["productCount"], 3);
        assert_eq!(value["payloadBlobPath"], "projects/p1/products_data.json");
    }

    #[test]
    fn test_unparseable_timestamp_is_absent() {
        assert!(timestamp::parse("yesterday").is_none());
        assert!(timestamp::parse("2024-03-01T10:15:30Z").is_some());
    }
}
