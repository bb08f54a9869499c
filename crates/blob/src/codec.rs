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

//! Conversions between blob addressing schemes.
//!
//! ## Purpose
//! A blob can be referred to in three ways:
//! - **Path**: bucket-relative, e.g. `projects/p1/images/abc.png`
//! - **gs:// URI**: `gs://{bucket}/{path}` (legacy documents only)
//! - **Public URL**: `https://{host}/{bucket}/{path}` with percent-encoded
//!   segments and an optional `?v=...` cache-busting suffix
//!
//! Reads accept all three. Writes only ever emit paths and HTTPS URLs: a
//! `gs://` URI cannot be dereferenced by a browser, so it is never handed
//! back to display code.
//!
//! Everything here is pure computation, no I/O.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Default public host for Cloud Storage objects.
pub const DEFAULT_PUBLIC_HOST: &str = "storage.googleapis.com";

const GS_SCHEME: &str = "gs://";

/// Characters left unescaped inside a single path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Bucket-scoped codec between blob paths, `gs://` URIs and public URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPathCodec {
    bucket: String,
    public_host: String,
}

impl BlobPathCodec {
    /// Create a codec for `bucket` using the default public host.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_host: DEFAULT_PUBLIC_HOST.to_string(),
        }
    }

    /// Override the public host (e.g. a storage emulator at `localhost:4443`).
    pub fn with_public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = host.into();
        self
    }

    /// Bucket this codec is scoped to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public host used when building URLs.
    pub fn public_host(&self) -> &str {
        &self.public_host
    }

    /// Resolve a `gs://` URI or public HTTPS URL to a bucket-relative path.
    ///
    /// Returns `None` when the reference uses an unknown scheme or host, names
    /// a different bucket, or carries no object path.
    pub fn to_path(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();

        if let Some(rest) = reference.strip_prefix(GS_SCHEME) {
            let rest = rest.split(['?', '#']).next().unwrap_or_default();
            let (bucket, path) = rest.split_once('/')?;
            return self.accept(bucket, path);
        }

        let url = Url::parse(reference).ok()?;
        if url.scheme() != "https" {
            return None;
        }
        if authority(&url)? != self.public_host {
            return None;
        }

        // Url::path() keeps the encoding; the query is already split off.
        let decoded = percent_decode_str(url.path().trim_start_matches('/'))
            .decode_utf8()
            .ok()?;
        let (bucket, path) = decoded.split_once('/')?;
        self.accept(bucket, path)
    }

    /// Build the public HTTPS URL for a bucket-relative path.
    pub fn to_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();
        format!(
            "https://{}/{}/{}",
            self.public_host,
            utf8_percent_encode(&self.bucket, SEGMENT),
            encoded.join("/")
        )
    }

    /// Build a `gs://` URI. For diagnostics and logs only.
    pub fn to_gs_uri(&self, path: &str) -> String {
        format!("{}{}/{}", GS_SCHEME, self.bucket, path.trim_start_matches('/'))
    }

    /// Normalize any supported reference to a display URL.
    ///
    /// HTTPS URLs that already point at this bucket are returned unchanged so
    /// a cache-busting query survives; `gs://` URIs are rewritten to HTTPS.
    pub fn to_display_url(&self, reference: &str) -> Option<String> {
        let path = self.to_path(reference)?;
        if reference.trim().starts_with("https://") {
            Some(reference.trim().to_string())
        } else {
            Some(self.to_url(&path))
        }
    }

    fn accept(&self, bucket: &str, path: &str) -> Option<String> {
        let path = path.trim_start_matches('/');
        if bucket != self.bucket || path.is_empty() {
            return None;
        }
        Some(path.to_string())
    }
}

/// `host[:port]` of a parsed URL.
fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Resolve `reference` against `bucket` using the default public host.
pub fn to_path(reference: &str, bucket: &str) -> Option<String> {
    BlobPathCodec::new(bucket).to_path(reference)
}

/// Public HTTPS URL of `path` in `bucket` using the default public host.
pub fn to_url(path: &str, bucket: &str) -> String {
    BlobPathCodec::new(bucket).to_url(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> BlobPathCodec {
        BlobPathCodec::new("catalog-bucket")
    }

    #[test]
    fn test_gs_uri_resolves_to_path() {
        assert_eq!(
            codec().to_path("gs://catalog-bucket/projects/p1/images/abc.png"),
            Some("projects/p1/images/abc.png".to_string())
        );
    }

    #[test]
    fn test_gs_uri_with_other_bucket_is_rejected() {
        assert_eq!(codec().to_path("gs://other-bucket/projects/p1/images/abc.png"), None);
        assert_eq!(codec().to_path("gs://catalog-bucket"), None);
        assert_eq!(codec().to_path("gs://catalog-bucket/"), None);
    }

    #[test]
    fn test_https_url_strips_query_and_decodes() {
        let url = "https://storage.googleapis.com/catalog-bucket/projects/p1/images/summer%20hat.png?v=1700000000000";
        assert_eq!(
            codec().to_path(url),
            Some("projects/p1/images/summer hat.png".to_string())
        );
    }

    #[test]
    fn test_https_url_with_other_bucket_or_host_is_rejected() {
        assert_eq!(
            codec().to_path("https://storage.googleapis.com/other/projects/p1/a.png"),
            None
        );
        assert_eq!(
            codec().to_path("https://cdn.example.com/catalog-bucket/projects/p1/a.png"),
            None
        );
    }

    #[test]
    fn test_unknown_schemes_are_rejected() {
        assert_eq!(codec().to_path("s3://catalog-bucket/projects/p1/a.png"), None);
        assert_eq!(codec().to_path("http://storage.googleapis.com/catalog-bucket/a.png"), None);
        assert_eq!(codec().to_path("projects/p1/a.png"), None);
        assert_eq!(codec().to_path(""), None);
    }

    #[test]
    fn test_to_url_is_https_and_encoded() {
        let url = codec().to_url("projects/p1/images/summer hat#2.png");
        assert_eq!(
            url,
            "https://storage.googleapis.com/catalog-bucket/projects/p1/images/summer%20hat%232.png"
        );
        assert!(!url.starts_with("gs://"));
        assert_eq!(
            codec().to_path(&url),
            Some("projects/p1/images/summer hat#2.png".to_string())
        );
    }

    #[test]
    fn test_custom_public_host_with_port() {
        let codec = codec().with_public_host("localhost:4443");
        let url = codec.to_url("projects/p1/a.png");
        assert_eq!(url, "https://localhost:4443/catalog-bucket/projects/p1/a.png");
        assert_eq!(codec.to_path(&url), Some("projects/p1/a.png".to_string()));
    }

    #[test]
    fn test_display_url_keeps_cache_buster_and_rewrites_gs() {
        let https = "https://storage.googleapis.com/catalog-bucket/projects/p1/a.png?v=42";
        assert_eq!(codec().to_display_url(https), Some(https.to_string()));
        assert_eq!(
            codec().to_display_url("gs://catalog-bucket/projects/p1/a.png"),
            Some("https://storage.googleapis.com/catalog-bucket/projects/p1/a.png".to_string())
        );
        assert_eq!(codec().to_display_url("ftp://nowhere/a.png"), None);
    }

    #[test]
    fn test_free_functions_use_default_host() {
        assert_eq!(
            to_url("projects/p1/a.png", "b"),
            "https://storage.googleapis.com/b/projects/p1/a.png"
        );
        assert_eq!(to_path("gs://b/projects/p1/a.png", "b"), Some("projects/p1/a.png".to_string()));
    }
}
