// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drop lifecycle: creation, owner edits, deletion, and listings.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::ids::new_document_id;
use crate::models::{
    total_size_mb, Coords, Drop, DropFile, DropStats, DropType, HuntDifficulty, RetrievalMode,
    Scope, User,
};
use crate::services::admin::{delete_drop_cascade, CascadeOutcome};
use crate::services::blob::BlobStore;
use crate::services::hunt::assign_hunt_code;
use crate::services::identity::Session;
use crate::services::tier::{can_create_drop, tier_limits, validate_drop_for_tier};
use crate::services::users::get_or_create_user;
use crate::time_utils::expiry_after_days;
use chrono::{DateTime, Utc};
use ring::rand::SecureRandom;
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

// ─── Requests ────────────────────────────────────────────────

/// File already uploaded to the bucket by the client.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDropFile {
    #[validate(length(min = 1, max = 1024))]
    pub path: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub size_bytes: u64,
}

impl From<NewDropFile> for DropFile {
    fn from(f: NewDropFile) -> Self {
        DropFile {
            path: f.path,
            name: f.name,
            size_bytes: f.size_bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDropRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub secret: String,
    #[validate(nested)]
    pub coords: Coords,
    #[validate(range(exclusive_min = 0.0, max = 100000.0))]
    pub geofence_radius_m: f64,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub drop_type: DropType,
    /// Requested join code; generated when absent.
    #[serde(default)]
    pub hunt_code: Option<String>,
    #[serde(default)]
    pub hunt_difficulty: Option<HuntDifficulty>,
    #[serde(default)]
    pub retrieval_mode: RetrievalMode,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[validate(nested)]
    #[serde(default)]
    pub files: Vec<NewDropFile>,
}

/// Owner edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDropRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub secret: Option<String>,
    #[validate(nested)]
    pub coords: Option<Coords>,
    #[validate(range(exclusive_min = 0.0, max = 100000.0))]
    pub geofence_radius_m: Option<f64>,
    pub scope: Option<Scope>,
    pub retrieval_mode: Option<RetrievalMode>,
    pub hunt_difficulty: Option<HuntDifficulty>,
    pub expires_at: Option<DateTime<Utc>>,
}

fn request_errors(
    result: Result<(), validator::ValidationErrors>,
) -> Result<Vec<String>, AppError> {
    match result {
        Ok(()) => Ok(Vec::new()),
        Err(e) => match AppError::from(e) {
            AppError::Validation(messages) => Ok(messages),
            other => Err(other),
        },
    }
}

fn check_future_expiry(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    errors: &mut Vec<String>,
) {
    if expires_at.is_some_and(|at| at <= now) {
        errors.push("expires_at: must be in the future".to_string());
    }
}

/// Run the tier policy over a (prospective) drop.
fn enforce_tier(user: &User, drop: &Drop) -> Result<(), AppError> {
    let validation = validate_drop_for_tier(
        user.tier,
        drop.total_file_size_mb(),
        drop.geofence_radius_m,
        drop.scope == Scope::Private,
        drop.retrieval_mode == RetrievalMode::Physical,
    );
    if validation.valid {
        Ok(())
    } else {
        tracing::debug!(
            uid = %user.uid,
            tier = %user.tier,
            violations = validation.errors.len(),
            "Drop rejected by tier policy"
        );
        Err(AppError::Validation(validation.messages()))
    }
}

// ─── Views ───────────────────────────────────────────────────

/// Drop as its owner sees it. The secret is never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerDropView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub coords: Coords,
    pub geofence_radius_m: f64,
    pub scope: Scope,
    pub drop_type: DropType,
    pub hunt_code: Option<String>,
    pub hunt_difficulty: Option<HuntDifficulty>,
    pub retrieval_mode: RetrievalMode,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub files: Vec<DropFile>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnerDropView {
    pub fn new(drop: Drop, now: DateTime<Utc>) -> Self {
        Self {
            expired: drop.is_expired(now),
            id: drop.id,
            title: drop.title,
            description: drop.description,
            coords: drop.coords,
            geofence_radius_m: drop.geofence_radius_m,
            scope: drop.scope,
            drop_type: drop.drop_type,
            hunt_code: drop.hunt_code,
            hunt_difficulty: drop.hunt_difficulty,
            retrieval_mode: drop.retrieval_mode,
            expires_at: drop.expires_at,
            files: drop.files,
            views: drop.stats.views,
            last_accessed_at: drop.stats.last_accessed_at,
            created_at: drop.created_at,
            updated_at: drop.updated_at,
        }
    }
}

/// Discovery listing entry: where a drop is, not what it holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicDropView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub coords: Coords,
    pub geofence_radius_m: f64,
    pub drop_type: DropType,
    pub retrieval_mode: RetrievalMode,
    pub file_count: usize,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Drop> for PublicDropView {
    fn from(drop: Drop) -> Self {
        Self {
            file_count: drop.files.len(),
            id: drop.id,
            title: drop.title,
            description: drop.description,
            coords: drop.coords,
            geofence_radius_m: drop.geofence_radius_m,
            drop_type: drop.drop_type,
            retrieval_mode: drop.retrieval_mode,
            expires_at: drop.expires_at,
            created_at: drop.created_at,
        }
    }
}

// ─── Operations ──────────────────────────────────────────────

/// Create a drop owned by the caller.
///
/// Checks run in this order: request shape, quota, tier policy, hunt code.
pub async fn create_drop(
    db: &dyn DocumentStore,
    rng: &(dyn SecureRandom + Sync),
    session: &Session,
    request: CreateDropRequest,
    now: DateTime<Utc>,
) -> Result<Drop, AppError> {
    let mut errors = request_errors(request.validate())?;
    check_future_expiry(request.expires_at, now, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = get_or_create_user(db, session, now).await?;

    let current = db.count_drops_for_owner(&user.uid).await?;
    if !can_create_drop(user.tier, current) {
        tracing::info!(uid = %user.uid, tier = %user.tier, current, "Drop limit reached");
        return Err(AppError::Forbidden(format!(
            "Drop limit reached: the {} tier allows {} drops",
            user.tier,
            tier_limits(user.tier).max_drops
        )));
    }

    let file_size_mb = total_size_mb(request.files.iter().map(|f| f.size_bytes));
    let validation = validate_drop_for_tier(
        user.tier,
        file_size_mb,
        request.geofence_radius_m,
        request.scope == Scope::Private,
        request.retrieval_mode == RetrievalMode::Physical,
    );
    if !validation.valid {
        return Err(AppError::Validation(validation.messages()));
    }

    let (hunt_code, hunt_difficulty) = match request.drop_type {
        DropType::Hunt => {
            let code = assign_hunt_code(db, rng, request.hunt_code.as_deref(), now).await?;
            (Some(code), Some(request.hunt_difficulty.unwrap_or_default()))
        }
        DropType::Normal => (None, None),
    };

    let expires_at = request
        .expires_at
        .unwrap_or_else(|| expiry_after_days(now, tier_limits(user.tier).default_expiry_days));

    let drop = Drop {
        id: new_document_id(rng)?,
        owner_id: user.uid.clone(),
        title: request.title.trim().to_string(),
        description: request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        secret: request.secret,
        coords: request.coords,
        geofence_radius_m: request.geofence_radius_m,
        scope: request.scope,
        drop_type: request.drop_type,
        hunt_code,
        hunt_difficulty,
        retrieval_mode: request.retrieval_mode,
        expires_at: Some(expires_at),
        files: request.files.into_iter().map(DropFile::from).collect(),
        stats: DropStats::default(),
        created_at: now,
        updated_at: now,
    };

    db.set_drop(&drop).await?;

    tracing::info!(
        drop_id = %drop.id,
        uid = %user.uid,
        drop_type = drop.drop_type.as_str(),
        files = drop.files.len(),
        "Drop created"
    );

    Ok(drop)
}

/// Apply an owner's edit, re-checking the result against their current tier.
pub async fn update_drop(
    db: &dyn DocumentStore,
    session: &Session,
    drop_id: &str,
    patch: UpdateDropRequest,
    now: DateTime<Utc>,
) -> Result<Drop, AppError> {
    let mut errors = request_errors(patch.validate())?;
    check_future_expiry(patch.expires_at, now, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut drop = db
        .get_drop(drop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Drop {} not found", drop_id)))?;

    if drop.owner_id != session.uid {
        return Err(AppError::Forbidden(
            "Only the owner can edit this drop".to_string(),
        ));
    }
    if drop.is_expired(now) {
        return Err(AppError::Expired("This drop has expired".to_string()));
    }

    if let Some(title) = patch.title {
        drop.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
        let description = description.trim();
        drop.description = (!description.is_empty()).then(|| description.to_string());
    }
    if let Some(secret) = patch.secret {
        drop.secret = secret;
    }
    if let Some(coords) = patch.coords {
        drop.coords = coords;
    }
    if let Some(radius) = patch.geofence_radius_m {
        drop.geofence_radius_m = radius;
    }
    if let Some(scope) = patch.scope {
        drop.scope = scope;
    }
    if let Some(mode) = patch.retrieval_mode {
        drop.retrieval_mode = mode;
    }
    if let Some(difficulty) = patch.hunt_difficulty {
        if drop.is_hunt() {
            drop.hunt_difficulty = Some(difficulty);
        }
    }
    if let Some(expires_at) = patch.expires_at {
        drop.expires_at = Some(expires_at);
    }

    let user = get_or_create_user(db, session, now).await?;
    enforce_tier(&user, &drop)?;

    drop.updated_at = now;
    db.set_drop(&drop).await?;

    tracing::info!(drop_id, uid = %session.uid, "Drop updated");
    Ok(drop)
}

/// Delete a drop the caller owns. Administrators may delete any drop.
pub async fn delete_own_drop(
    db: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    session: &Session,
    drop_id: &str,
) -> Result<CascadeOutcome, AppError> {
    let drop = db
        .get_drop(drop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Drop {} not found", drop_id)))?;

    if drop.owner_id != session.uid {
        let is_admin = db
            .get_user(&session.uid)
            .await?
            .is_some_and(|u| u.is_admin);
        if !is_admin {
            return Err(AppError::Forbidden(
                "Only the owner can delete this drop".to_string(),
            ));
        }
        tracing::info!(drop_id, admin = %session.uid, "Admin deleting another user's drop");
    }

    delete_drop_cascade(db, blobs, drop_id).await
}

/// The caller's drops, newest first, expired ones included and flagged.
pub async fn list_my_drops(
    db: &dyn DocumentStore,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<Vec<OwnerDropView>, AppError> {
    Ok(db
        .drops_for_owner(&session.uid)
        .await?
        .into_iter()
        .map(|d| OwnerDropView::new(d, now))
        .collect())
}

/// Public, live drops for discovery.
pub async fn list_public_drops(
    db: &dyn DocumentStore,
    now: DateTime<Utc>,
) -> Result<Vec<PublicDropView>, AppError> {
    Ok(db
        .drops_with_scope(Scope::Public)
        .await?
        .into_iter()
        .filter(|d| !d.is_expired(now))
        .map(PublicDropView::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::ids::system_rng;
    use crate::models::Tier;
    use chrono::Duration;

    fn session(uid: &str) -> Session {
        Session {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
        }
    }

    fn request() -> CreateDropRequest {
        CreateDropRequest {
            title: "Picnic photos".to_string(),
            description: None,
            secret: "blue heron".to_string(),
            coords: Coords::new(37.4, -122.1),
            geofence_radius_m: 100.0,
            scope: Scope::Public,
            drop_type: DropType::Normal,
            hunt_code: None,
            hunt_difficulty: None,
            retrieval_mode: RetrievalMode::Remote,
            expires_at: None,
            files: vec![NewDropFile {
                path: "drops/alice/photo.jpg".to_string(),
                name: "photo.jpg".to_string(),
                size_bytes: 2 * 1024 * 1024,
            }],
        }
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_create_drop_future_is_send() {
        let db = MemoryDb::new();
        let rng = system_rng();
        let session = session("alice");
        // Handlers spawn this future onto the runtime
        let fut = create_drop(&db, &rng, &session, request(), Utc::now());
        assert_send(&fut);
    }

    #[tokio::test]
    async fn test_list_public_drops_skips_private_and_expired() {
        let db = MemoryDb::new();
        let rng = system_rng();
        let now = Utc::now();

        let public = create_drop(&db, &rng, &session("alice"), request(), now)
            .await
            .unwrap();
        let mut hidden = request();
        hidden.scope = Scope::Private;
        hidden.geofence_radius_m = 50.0;
        let mut user = get_or_create_user(&db, &session("bob"), now).await.unwrap();
        user.tier = Tier::Premium;
        db.upsert_user(&user).await.unwrap();
        create_drop(&db, &rng, &session("bob"), hidden, now).await.unwrap();

        let mut stale = public.clone();
        stale.id = "stale".to_string();
        stale.expires_at = Some(now - Duration::minutes(1));
        db.set_drop(&stale).await.unwrap();

        let listed = list_public_drops(&db, now).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, public.id);
    }

    #[tokio::test]
    async fn test_create_drop_defaults_expiry_from_tier() {
        let db = MemoryDb::new();
        let now = Utc::now();

        let drop = create_drop(&db, &system_rng(), &session("alice"), request(), now)
            .await
            .unwrap();

        assert_eq!(drop.owner_id, "alice");
        assert_eq!(drop.expires_at, Some(now + Duration::days(30)));
        assert!(drop.hunt_code.is_none());
        assert!(db.get_drop(&drop.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_drop_collects_request_errors() {
        let db = MemoryDb::new();
        let now = Utc::now();
        let mut req = request();
        req.title = String::new();
        req.secret = String::new();
        req.expires_at = Some(now - Duration::hours(1));

        let err = create_drop(&db, &system_rng(), &session("alice"), req, now)
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => {
                assert_eq!(errors.len(), 3, "{errors:?}");
                assert!(errors.iter().any(|e| e.starts_with("title")));
                assert!(errors.iter().any(|e| e.starts_with("secret")));
                assert!(errors.iter().any(|e| e.starts_with("expires_at")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_drop_free_tier_policy_violations() {
        let db = MemoryDb::new();
        let mut req = request();
        req.geofence_radius_m = 20.0;
        req.scope = Scope::Private;
        req.retrieval_mode = RetrievalMode::Physical;

        let err = create_drop(&db, &system_rng(), &session("alice"), req, Utc::now())
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_drop_enforces_quota() {
        let db = MemoryDb::new();
        let rng = system_rng();
        let now = Utc::now();
        let alice = session("alice");

        for _ in 0..10 {
            create_drop(&db, &rng, &alice, request(), now).await.unwrap();
        }
        let err = create_drop(&db, &rng, &alice, request(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let mut user = db.get_user("alice").await.unwrap().unwrap();
        user.tier = Tier::Premium;
        db.upsert_user(&user).await.unwrap();
        assert!(create_drop(&db, &rng, &alice, request(), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_hunt_assigns_uppercase_code() {
        let db = MemoryDb::new();
        let mut req = request();
        req.drop_type = DropType::Hunt;
        req.hunt_code = Some("tr34sr".to_string());

        let drop = create_drop(&db, &system_rng(), &session("alice"), req, Utc::now())
            .await
            .unwrap();

        assert_eq!(drop.hunt_code.as_deref(), Some("TR34SR"));
        assert_eq!(drop.hunt_difficulty, Some(HuntDifficulty::Intermediate));
    }

    #[tokio::test]
    async fn test_update_drop_rechecks_tier() {
        let db = MemoryDb::new();
        let now = Utc::now();
        let alice = session("alice");
        let drop = create_drop(&db, &system_rng(), &alice, request(), now)
            .await
            .unwrap();

        let patch = UpdateDropRequest {
            retrieval_mode: Some(RetrievalMode::Physical),
            ..Default::default()
        };
        let err = update_drop(&db, &alice, &drop.id, patch, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let patch = UpdateDropRequest {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = update_drop(&db, &alice, &drop.id, patch, now).await.unwrap();
        assert_eq!(updated.title, "Renamed");
    }

    #[tokio::test]
    async fn test_update_drop_rejects_non_owner() {
        let db = MemoryDb::new();
        let now = Utc::now();
        let drop = create_drop(&db, &system_rng(), &session("alice"), request(), now)
            .await
            .unwrap();

        let err = update_drop(&db, &session("mallory"), &drop.id, UpdateDropRequest::default(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_public_listing_hides_private_and_expired() {
        let db = MemoryDb::new();
        let rng = system_rng();
        let now = Utc::now();
        let alice = session("alice");

        let mut user = User::new("alice", "alice@example.com", now);
        user.tier = Tier::Premium;
        db.upsert_user(&user).await.unwrap();

        let visible = create_drop(&db, &rng, &alice, request(), now).await.unwrap();
        let mut private = request();
        private.scope = Scope::Private;
        create_drop(&db, &rng, &alice, private, now).await.unwrap();
        let mut short = request();
        short.expires_at = Some(now + Duration::minutes(1));
        create_drop(&db, &rng, &alice, short, now).await.unwrap();

        let later = now + Duration::minutes(5);
        let listed = list_public_drops(&db, later).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, visible.id);

        let mine = list_my_drops(&db, &alice, later).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine.iter().filter(|d| d.expired).count(), 1);
    }
}
