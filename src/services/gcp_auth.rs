// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth access tokens for Google REST APIs, fetched from the metadata server.

use crate::error::AppError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Caches the runtime service account's access token.
///
/// The cache lock is only held to read or store an entry, never across the
/// metadata request.
pub struct MetadataTokenSource {
    http: reqwest::Client,
    url: String,
    cache: RwLock<Option<CachedToken>>,
}

impl MetadataTokenSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_url(http, METADATA_TOKEN_URL)
    }

    pub fn with_url(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            cache: RwLock::new(None),
        }
    }

    /// Current access token, refreshed when close to expiry.
    pub async fn access_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let fetched = self.fetch().await?;

        let mut cache = self.cache.write().await;
        // A concurrent refresh may have stored a longer-lived token.
        match cache.as_ref() {
            Some(entry) if entry.expires_at >= fetched.expires_at => Ok(entry.token.clone()),
            _ => {
                let token = fetched.token.clone();
                *cache = Some(fetched);
                Ok(token)
            }
        }
    }

    async fn cached(&self) -> Option<String> {
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.token.clone())
    }

    async fn fetch(&self) -> Result<CachedToken, AppError> {
        let response = self
            .http
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Metadata token request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Metadata token request returned status {}",
                response.status()
            )));
        }

        let body: MetadataTokenResponse = response.json().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Metadata token parse error: {}", e))
        })?;

        tracing::debug!(expires_in = body.expires_in, "Refreshed metadata access token");
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}
