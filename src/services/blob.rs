// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob storage for drop files. Only deletion is needed here; uploads go
//! straight from the client to the bucket.

use crate::error::AppError;
use crate::services::gcp_auth::MetadataTokenSource;
use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::Arc;

/// Blob store collaborator. Each path fails independently.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Delete the object at `path`. Deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> Result<(), AppError>;
}

/// Cloud Storage JSON API client.
pub struct GcsBlobStore {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    /// `None` when talking to the storage emulator.
    tokens: Option<MetadataTokenSource>,
}

impl GcsBlobStore {
    /// For local development with emulator, set STORAGE_EMULATOR_HOST.
    pub fn new(bucket: &str, http: reqwest::Client) -> Self {
        match std::env::var("STORAGE_EMULATOR_HOST") {
            Ok(host) => {
                let base_url = if host.starts_with("http") {
                    host.trim_end_matches('/').to_string()
                } else {
                    format!("http://{}", host)
                };
                tracing::info!(base_url = %base_url, "Using Cloud Storage emulator");
                Self {
                    http,
                    base_url,
                    bucket: bucket.to_string(),
                    tokens: None,
                }
            }
            Err(_) => Self {
                tokens: Some(MetadataTokenSource::new(http.clone())),
                http,
                base_url: "https://storage.googleapis.com".to_string(),
                bucket: bucket.to_string(),
            },
        }
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(path)
        );

        let mut request = self.http.delete(&url);
        if let Some(tokens) = &self.tokens {
            request = request.bearer_auth(tokens.access_token().await?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 404 {
            tracing::debug!(path, "Blob already absent");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Storage(format!("HTTP {}: {}", status, body)))
    }
}

/// In-process blob store for local development and tests.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<DashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str) {
        self.objects.insert(path.to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains(path)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.objects.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_blob_delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.insert("drops/a/file.txt");

        store.delete("drops/a/file.txt").await.unwrap();
        assert!(!store.contains("drops/a/file.txt"));
        store.delete("drops/a/file.txt").await.unwrap();
        assert!(store.is_empty());
    }
}
