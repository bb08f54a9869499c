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

//! Shared fixtures for end-to-end tests.

#![allow(dead_code)]

use async_trait::async_trait;
use catalogvault::{
    BlobError, BlobPathCodec, BlobStore, DocumentError, DocumentStore, InMemoryDocumentStore,
    ObjectStoreBlobStore, PendingImage, Product, Project, ProjectStore, ProjectStoreConfig,
};
use catalogvault::blob::BlobResult;
use catalogvault::document::DocumentResult;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BUCKET: &str = "catalog-bucket";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory blob store with switchable faults and call accounting.
pub struct FaultyBlobStore {
    inner: ObjectStoreBlobStore,
    failing_puts: Mutex<Vec<String>>,
    failing_deletes: Mutex<Vec<String>>,
    forbidden_reads: Mutex<Vec<String>>,
    put_delay: Mutex<Option<Duration>>,
    puts: AtomicUsize,
    reads: Mutex<Vec<String>>,
}

impl FaultyBlobStore {
    pub fn new() -> Self {
        Self {
            inner: ObjectStoreBlobStore::in_memory(BUCKET),
            failing_puts: Mutex::new(Vec::new()),
            failing_deletes: Mutex::new(Vec::new()),
            forbidden_reads: Mutex::new(Vec::new()),
            put_delay: Mutex::new(None),
            puts: AtomicUsize::new(0),
            reads: Mutex::new(Vec::new()),
        }
    }

    /// Fail every put whose path contains `fragment`.
    pub fn fail_puts_to(&self, fragment: &str) {
        self.failing_puts.lock().unwrap().push(fragment.to_string());
    }

    /// Fail every delete whose path contains `fragment`.
    pub fn fail_deletes_to(&self, fragment: &str) {
        self.failing_deletes.lock().unwrap().push(fragment.to_string());
    }

    /// Fail every get whose path ends with `suffix`.
    pub fn forbid_reads_of(&self, suffix: &str) {
        self.forbidden_reads.lock().unwrap().push(suffix.to_string());
    }

    pub fn delay_puts(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = Some(delay);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> BlobResult<String> {
        let delay = *self.put_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failing_puts
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| path.contains(fragment.as_str()));
        if failing {
            return Err(BlobError::StorageError(format!("injected put failure: {}", path)));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(path, data, content_type).await
    }

    async fn get(&self, path: &str) -> BlobResult<Option<Vec<u8>>> {
        self.reads.lock().unwrap().push(path.to_string());
        let forbidden = self
            .forbidden_reads
            .lock()
            .unwrap()
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()));
        if forbidden {
            return Err(BlobError::StorageError(format!("injected read failure: {}", path)));
        }
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> BlobResult<()> {
        let failing = self
            .failing_deletes
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| path.contains(fragment.as_str()));
        if failing {
            return Err(BlobError::StorageError(format!("injected delete failure: {}", path)));
        }
        self.inner.delete(path).await
    }

    async fn list_by_prefix(&self, prefix: &str) -> BlobResult<Vec<String>> {
        self.inner.list_by_prefix(prefix).await
    }

    fn codec(&self) -> &BlobPathCodec {
        self.inner.codec()
    }
}

/// In-memory document store whose writes can be switched to fail.
pub struct FaultyDocumentStore {
    inner: InMemoryDocumentStore,
    failing_writes: AtomicBool,
}

impl FaultyDocumentStore {
    pub fn new(inner: InMemoryDocumentStore) -> Self {
        Self {
            inner,
            failing_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FaultyDocumentStore {
    async fn set(&self, collection: &str, id: &str, document: &Value) -> DocumentResult<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(DocumentError::StorageError(format!(
                "injected write failure: {}/{}",
                collection, id
            )));
        }
        self.inner.set(collection, id, document).await
    }

    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Value>> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: &str) -> DocumentResult<Vec<Value>> {
        self.inner.list(collection).await
    }

    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()> {
        self.inner.delete(collection, id).await
    }

    fn max_document_bytes(&self) -> usize {
        self.inner.max_document_bytes()
    }
}

pub struct Harness {
    pub store: ProjectStore,
    pub blobs: Arc<FaultyBlobStore>,
    pub documents: Arc<FaultyDocumentStore>,
}

pub fn harness() -> Harness {
    harness_with(InMemoryDocumentStore::new())
}

/// Harness whose document store rejects documents above `limit` bytes.
pub fn harness_with_document_limit(limit: usize) -> Harness {
    harness_with(InMemoryDocumentStore::with_max_document_bytes(limit))
}

fn harness_with(documents: InMemoryDocumentStore) -> Harness {
    init_tracing();
    let blobs = Arc::new(FaultyBlobStore::new());
    let documents = Arc::new(FaultyDocumentStore::new(documents));
    let store = ProjectStore::new(
        documents.clone(),
        blobs.clone(),
        ProjectStoreConfig::default(),
    );
    Harness {
        store,
        blobs,
        documents,
    }
}

/// Two-product catalog; `ABC123` carries image bytes named `image`.
pub fn catalog(id: &str, image: &str) -> Project {
    Project::new(id, "Spring Catalog").with_products(
        vec!["ATT Color".to_string(), "ATT Material".to_string()],
        vec!["DIST Online".to_string(), "DIST Retail".to_string()],
        vec![
            Product::new("ABC123", "Straw hat", "12.50")
                .with_attribute("ATT Color", "Natural")
                .with_attribute("ATT Material", "Straw")
                .with_distribution("DIST Online", true)
                .with_distribution("DIST Retail", false)
                .with_image(PendingImage::new(image, image.as_bytes().to_vec())),
            Product::new("XYZ9", "Linen scarf", "8.00")
                .with_attribute("ATT Color", "Blue")
                .with_attribute("ATT Material", "Linen")
                .with_distribution("DIST Online", true)
                .with_distribution("DIST Retail", true),
        ],
    )
}
