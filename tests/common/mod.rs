// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use geodrop::config::Config;
use geodrop::db::{DocumentStore, FirestoreDb, MemoryDb};
use geodrop::error::AppError;
use geodrop::ids::system_rng;
use geodrop::models::{
    Coords, Drop, DropFile, DropStats, DropType, Report, RetrievalMode, Scope, Tier, User,
};
use geodrop::routes::create_router;
use geodrop::services::identity::{create_session_token, Identity};
use geodrop::services::{BlobStore, IdentityProvider, JwtIdentityProvider, MemoryBlobStore};
use geodrop::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique suffix for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

// ─── Doubles ─────────────────────────────────────────────────

/// Memory store that counts every call, to prove an operation never
/// reached the store.
#[derive(Clone, Default)]
pub struct CountingStore {
    pub inner: MemoryDb,
    calls: Arc<AtomicUsize>,
    fail_batches: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// Make every atomic batch delete fail.
    pub fn fail_batches(&self) {
        self.fail_batches.store(true, Ordering::SeqCst);
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.tick();
        self.inner.get_user(uid).await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.tick();
        self.inner.upsert_user(user).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.tick();
        self.inner.list_users().await
    }

    async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        self.tick();
        self.inner.delete_user(uid).await
    }

    async fn get_drop(&self, drop_id: &str) -> Result<Option<Drop>, AppError> {
        self.tick();
        self.inner.get_drop(drop_id).await
    }

    async fn set_drop(&self, drop: &Drop) -> Result<(), AppError> {
        self.tick();
        self.inner.set_drop(drop).await
    }

    async fn list_drops(&self) -> Result<Vec<Drop>, AppError> {
        self.tick();
        self.inner.list_drops().await
    }

    async fn drops_for_owner(&self, owner_id: &str) -> Result<Vec<Drop>, AppError> {
        self.tick();
        self.inner.drops_for_owner(owner_id).await
    }

    async fn drops_with_scope(&self, scope: Scope) -> Result<Vec<Drop>, AppError> {
        self.tick();
        self.inner.drops_with_scope(scope).await
    }

    async fn count_drops_for_owner(&self, owner_id: &str) -> Result<usize, AppError> {
        self.tick();
        self.inner.count_drops_for_owner(owner_id).await
    }

    async fn find_hunt_by_code(&self, code: &str) -> Result<Option<Drop>, AppError> {
        self.tick();
        self.inner.find_hunt_by_code(code).await
    }

    async fn record_drop_access(&self, drop_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.tick();
        self.inner.record_drop_access(drop_id, at).await
    }

    async fn delete_drop(&self, drop_id: &str) -> Result<(), AppError> {
        self.tick();
        self.inner.delete_drop(drop_id).await
    }

    async fn delete_drops_atomic(&self, drop_ids: &[String]) -> Result<(), AppError> {
        self.tick();
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(AppError::Database("batch rejected".to_string()));
        }
        self.inner.delete_drops_atomic(drop_ids).await
    }

    async fn create_report(&self, report: &Report) -> Result<(), AppError> {
        self.tick();
        self.inner.create_report(report).await
    }
}

/// Blob store where chosen paths always fail to delete.
#[derive(Clone, Default)]
pub struct FlakyBlobStore {
    pub inner: MemoryBlobStore,
    failing: Arc<DashSet<String>>,
}

#[allow(dead_code)]
impl FlakyBlobStore {
    pub fn fail_on(&self, path: &str) {
        self.failing.insert(path.to_string());
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn delete(&self, path: &str) -> Result<(), AppError> {
        if self.failing.contains(path) {
            return Err(AppError::Storage(format!("simulated failure for {}", path)));
        }
        self.inner.delete(path).await
    }
}

/// Real token verification, with identity deletion that can be made to fail.
pub struct TestIdentity {
    tokens: JwtIdentityProvider,
    fail_deletes: AtomicBool,
    pub deleted: DashSet<String>,
}

#[allow(dead_code)]
impl TestIdentity {
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for TestIdentity {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Identity> {
        self.tokens.resolve(headers).await
    }

    async fn delete_identity(&self, uid: &str) -> Result<(), AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Identity("identity service unavailable".to_string()));
        }
        self.deleted.insert(uid.to_string());
        Ok(())
    }
}

// ─── Test App ────────────────────────────────────────────────

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: CountingStore,
    pub blobs: FlakyBlobStore,
    pub identity: Arc<TestIdentity>,
}

/// Create a test app backed by in-memory doubles.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let store = CountingStore::default();
    let blobs = FlakyBlobStore::default();
    let identity = Arc::new(TestIdentity {
        tokens: JwtIdentityProvider::new(&config.jwt_signing_key),
        fail_deletes: AtomicBool::new(false),
        deleted: DashSet::new(),
    });

    let state = Arc::new(AppState {
        config,
        db: Arc::new(store.clone()),
        blobs: Arc::new(blobs.clone()),
        identity: identity.clone(),
        rng: system_rng(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        blobs,
        identity,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Session token for `uid`, signed with the app's key.
    pub fn token(&self, uid: &str) -> String {
        create_session_token(
            uid,
            &format!("{}@example.com", uid),
            &self.state.config.jwt_signing_key,
        )
        .unwrap()
    }

    /// Send a request and decode the JSON body (Null when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn seed_user(&self, uid: &str, tier: Tier, is_admin: bool) -> User {
        let mut user = User::new(uid, &format!("{}@example.com", uid), Utc::now());
        user.tier = tier;
        user.is_admin = is_admin;
        self.store.inner.upsert_user(&user).await.unwrap();
        user
    }

    pub async fn seed_drop(&self, drop: &Drop) {
        self.store.inner.set_drop(drop).await.unwrap();
    }
}

// ─── Fixtures ────────────────────────────────────────────────

/// A live remote-mode drop with no files.
#[allow(dead_code)]
pub fn drop_fixture(id: &str, owner_id: &str) -> Drop {
    let now = Utc::now();
    Drop {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        title: format!("Drop {}", id),
        description: Some("Under the oak tree".to_string()),
        secret: "open sesame".to_string(),
        coords: Coords::new(37.3318, -122.0312),
        geofence_radius_m: 100.0,
        scope: Scope::Public,
        drop_type: DropType::Normal,
        hunt_code: None,
        hunt_difficulty: None,
        retrieval_mode: RetrievalMode::Remote,
        expires_at: Some(now + chrono::Duration::days(30)),
        files: vec![],
        stats: DropStats::default(),
        created_at: now,
        updated_at: now,
    }
}

#[allow(dead_code)]
pub fn file(path: &str) -> DropFile {
    DropFile {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        size_bytes: 1024,
    }
}
