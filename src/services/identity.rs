// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider: resolves a request to a verified `{uid, email}`.
//!
//! Credentials are never checked here beyond verifying the signed session
//! token the identity provider issued.

use crate::error::AppError;
use crate::services::gcp_auth::MetadataTokenSource;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Cookie carrying the session token (the Authorization header also works).
pub const SESSION_COOKIE: &str = "geodrop_token";

const SESSION_LIFETIME_SECS: usize = 30 * 24 * 60 * 60;

/// Verified identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Per-request session, created when a request arrives and dropped with it.
#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub email: String,
}

impl Session {
    pub fn new(identity: Identity) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
        }
    }
}

/// Identity collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the caller, or `None` if the request carries no valid identity.
    async fn resolve(&self, headers: &HeaderMap) -> Option<Identity>;

    /// Remove the identity record for `uid`.
    async fn delete_identity(&self, uid: &str) -> Result<(), AppError>;
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (uid)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Create a signed session token.
pub fn create_session_token(
    uid: &str,
    email: &str,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + SESSION_LIFETIME_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Pull the session token from the cookie, falling back to a bearer header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Verifies HS256 session tokens; deletes identities via Identity Toolkit.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    accounts: Option<IdentityToolkitClient>,
}

impl JwtIdentityProvider {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(signing_key),
            accounts: None,
        }
    }

    /// Attach the account admin client used by `delete_identity`.
    pub fn with_accounts(mut self, accounts: IdentityToolkitClient) -> Self {
        self.accounts = Some(accounts);
        self
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = extract_token(headers)?;
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(&token, &self.decoding_key, &validation) {
            Ok(data) if !data.claims.sub.is_empty() => Some(Identity {
                uid: data.claims.sub,
                email: data.claims.email,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                None
            }
        }
    }

    async fn delete_identity(&self, uid: &str) -> Result<(), AppError> {
        match &self.accounts {
            Some(accounts) => accounts.delete_account(uid).await,
            None => {
                tracing::debug!(uid, "No account admin configured, skipping identity deletion");
                Ok(())
            }
        }
    }
}

/// Minimal Identity Toolkit admin client.
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    /// `None` when talking to the auth emulator.
    tokens: Option<MetadataTokenSource>,
}

impl IdentityToolkitClient {
    /// For local development with emulator, set FIREBASE_AUTH_EMULATOR_HOST.
    pub fn new(project_id: &str, http: reqwest::Client) -> Self {
        match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Identity Toolkit emulator");
                Self {
                    http,
                    base_url: format!("http://{}/identitytoolkit.googleapis.com", host),
                    project_id: project_id.to_string(),
                    tokens: None,
                }
            }
            Err(_) => Self {
                tokens: Some(MetadataTokenSource::new(http.clone())),
                http,
                base_url: "https://identitytoolkit.googleapis.com".to_string(),
                project_id: project_id.to_string(),
            },
        }
    }

    /// Delete the account with local id `uid`.
    pub async fn delete_account(&self, uid: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/v1/projects/{}/accounts:delete",
            self.base_url, self.project_id
        );

        let token = match &self.tokens {
            Some(tokens) => tokens.access_token().await?,
            // The emulator accepts this fixed token as an admin credential.
            None => "owner".to_string(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "localId": uid }))
            .send()
            .await
            .map_err(|e| AppError::Identity(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Identity(format!("HTTP {}: {}", status, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[tokio::test]
    async fn test_resolve_bearer_token() {
        let token = create_session_token("uid-1", "a@example.com", KEY).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let identity = JwtIdentityProvider::new(KEY).resolve(&headers).await;
        assert_eq!(
            identity,
            Some(Identity {
                uid: "uid-1".to_string(),
                email: "a@example.com".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_cookie_token() {
        let token = create_session_token("uid-2", "b@example.com", KEY).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token)).unwrap(),
        );

        let identity = JwtIdentityProvider::new(KEY).resolve(&headers).await;
        assert_eq!(identity.map(|i| i.uid), Some("uid-2".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_rejects_wrong_key_and_missing_token() {
        let token =
            create_session_token("uid-3", "c@example.com", b"another_key_entirely_32_bytes!!")
                .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let provider = JwtIdentityProvider::new(KEY);
        assert_eq!(provider.resolve(&headers).await, None);
        assert_eq!(provider.resolve(&HeaderMap::new()).await, None);
    }

    #[tokio::test]
    async fn test_delete_identity_without_admin_client_is_noop() {
        let provider = JwtIdentityProvider::new(KEY);
        assert!(provider.delete_identity("uid-4").await.is_ok());
    }
}
