// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Administrative operations: the admin gate, cascade deletion, and
//! user management.
//!
//! Cascades are best-effort for secondary resources (blobs, identity
//! records). Failures there are reported as warnings on an otherwise
//! successful outcome and never undo the document-level deletion.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{Drop, DropType, RetrievalMode, Scope, Tier, User};
use crate::services::blob::BlobStore;
use crate::services::identity::{IdentityProvider, Session};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Upper bound on in-flight collaborator calls per fan-out.
pub const MAX_CONCURRENT_OPS: usize = 16;

/// Identity confirmed to belong to an administrator.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub uid: String,
    pub email: String,
}

/// Gate for every admin-only operation.
///
/// 401 without a session, 404 without a user record, 403 for non-admins.
pub async fn require_admin(
    db: &dyn DocumentStore,
    session: Option<&Session>,
) -> Result<AdminSession, AppError> {
    let session = session.ok_or(AppError::Unauthorized)?;

    let user = db
        .get_user(&session.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", session.uid)))?;

    if !user.is_admin {
        tracing::warn!(uid = %session.uid, "Non-admin attempted admin operation");
        return Err(AppError::Forbidden("Administrator access required".to_string()));
    }

    Ok(AdminSession {
        uid: user.uid,
        email: user.email,
    })
}

// ─── Cascade Outcomes ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupResource {
    Blob,
    Identity,
}

/// A secondary resource that could not be cleaned up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupWarning {
    pub resource: CleanupResource,
    /// Blob path or uid
    pub target: String,
    pub error: String,
}

/// Result of a cascade whose primary (document) deletion succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "warnings", rename_all = "snake_case")]
pub enum CascadeOutcome {
    Completed,
    CompletedWithWarnings(Vec<CleanupWarning>),
}

impl CascadeOutcome {
    fn from_warnings(warnings: Vec<CleanupWarning>) -> Self {
        if warnings.is_empty() {
            CascadeOutcome::Completed
        } else {
            CascadeOutcome::CompletedWithWarnings(warnings)
        }
    }

    pub fn warnings(&self) -> &[CleanupWarning] {
        match self {
            CascadeOutcome::Completed => &[],
            CascadeOutcome::CompletedWithWarnings(warnings) => warnings,
        }
    }
}

/// Delete every path concurrently, collecting failures instead of stopping.
async fn delete_blobs(blobs: &dyn BlobStore, paths: Vec<String>) -> Vec<CleanupWarning> {
    stream::iter(paths)
        .map(|path| async move {
            match blobs.delete(&path).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to delete blob, continuing");
                    Some(CleanupWarning {
                        resource: CleanupResource::Blob,
                        target: path,
                        error: e.to_string(),
                    })
                }
            }
        })
        .buffer_unordered(MAX_CONCURRENT_OPS)
        .filter_map(|warning| async move { warning })
        .collect()
        .await
}

fn file_paths<'a>(drops: impl IntoIterator<Item = &'a Drop>) -> Vec<String> {
    drops
        .into_iter()
        .flat_map(|d| d.files.iter().map(|f| f.path.clone()))
        .collect()
}

// ─── Cascade Deletion ────────────────────────────────────────

/// Delete a drop: files first (best-effort), then the document.
pub async fn delete_drop_cascade(
    db: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    drop_id: &str,
) -> Result<CascadeOutcome, AppError> {
    let drop = db
        .get_drop(drop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Drop {} not found", drop_id)))?;

    let warnings = delete_blobs(blobs, file_paths([&drop])).await;

    db.delete_drop(&drop.id).await?;

    tracing::info!(
        drop_id,
        files = drop.files.len(),
        failed_files = warnings.len(),
        "Drop deleted"
    );

    Ok(CascadeOutcome::from_warnings(warnings))
}

/// Delete a user with all their drops and files, then their identity record.
///
/// Drop documents are removed in one atomic batch before any file is
/// touched, so a failed batch leaves every drop intact. Blob and identity
/// cleanup are best-effort.
pub async fn delete_user_cascade(
    db: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    identity: &dyn IdentityProvider,
    user_id: &str,
) -> Result<CascadeOutcome, AppError> {
    if db.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    let drops = db.drops_for_owner(user_id).await?;
    let drop_ids: Vec<String> = drops.iter().map(|d| d.id.clone()).collect();
    db.delete_drops_atomic(&drop_ids).await?;
    tracing::debug!(user_id, count = drop_ids.len(), "Deleted user's drops");

    db.delete_user(user_id).await?;
    tracing::debug!(user_id, "Deleted user profile");

    let mut warnings = delete_blobs(blobs, file_paths(&drops)).await;

    if let Err(e) = identity.delete_identity(user_id).await {
        tracing::warn!(user_id, error = %e, "Failed to delete identity record, continuing");
        warnings.push(CleanupWarning {
            resource: CleanupResource::Identity,
            target: user_id.to_string(),
            error: e.to_string(),
        });
    }

    tracing::info!(
        user_id,
        drops = drop_ids.len(),
        warnings = warnings.len(),
        "User deletion complete"
    );

    Ok(CascadeOutcome::from_warnings(warnings))
}

// ─── User Management ─────────────────────────────────────────

/// Grant or revoke the admin flag.
pub async fn set_admin(
    db: &dyn DocumentStore,
    admin: &AdminSession,
    user_id: &str,
    is_admin: bool,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    if admin.uid == user_id && !is_admin {
        return Err(AppError::BadRequest(
            "Administrators cannot revoke their own admin access".to_string(),
        ));
    }

    let mut user = db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    user.is_admin = is_admin;
    user.updated_at = now;
    db.upsert_user(&user).await?;

    tracing::info!(by = %admin.uid, user_id, is_admin, "Admin flag updated");
    Ok(user)
}

/// Change a user's tier. `tier` must name a known tier.
pub async fn update_tier(
    db: &dyn DocumentStore,
    admin: &AdminSession,
    user_id: &str,
    tier: &str,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    let tier: Tier = tier
        .parse()
        .map_err(|e: crate::models::TierError| {
            AppError::Validation(vec![format!("tier: {}", e)])
        })?;

    let mut user = db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    user.tier = tier;
    user.updated_at = now;
    db.upsert_user(&user).await?;

    tracing::info!(by = %admin.uid, user_id, tier = %tier, "Tier updated");
    Ok(user)
}

// ─── Listings ────────────────────────────────────────────────

/// User row in the admin console.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminUserView {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub tier: Tier,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub drop_count: usize,
}

/// Drop row in the admin console. No secret, hunt code, or file paths.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminDropView {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub owner_email: Option<String>,
    pub scope: Scope,
    pub drop_type: DropType,
    pub retrieval_mode: RetrievalMode,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub views: u64,
    pub file_count: usize,
    pub created_at: DateTime<Utc>,
}

/// All users, newest first, each with their drop count.
pub async fn list_users_with_drop_counts(
    db: &dyn DocumentStore,
) -> Result<Vec<AdminUserView>, AppError> {
    let users = db.list_users().await?;

    stream::iter(users)
        .map(|user| async move {
            let drop_count = db.count_drops_for_owner(&user.uid).await?;
            Ok::<_, AppError>(AdminUserView {
                uid: user.uid,
                email: user.email,
                display_name: user.display_name,
                tier: user.tier,
                is_admin: user.is_admin,
                created_at: user.created_at,
                drop_count,
            })
        })
        // `buffered` keeps the newest-first order
        .buffered(MAX_CONCURRENT_OPS)
        .collect::<Vec<Result<AdminUserView, AppError>>>()
        .await
        .into_iter()
        .collect()
}

/// All drops, newest first, each with its owner's email.
pub async fn list_drops_with_owner_email(
    db: &dyn DocumentStore,
    now: DateTime<Utc>,
) -> Result<Vec<AdminDropView>, AppError> {
    let drops = db.list_drops().await?;

    let owner_ids: HashSet<String> = drops.iter().map(|d| d.owner_id.clone()).collect();
    let owner_emails: HashMap<String, String> = stream::iter(owner_ids)
        .map(|owner_id| async move {
            let user = db.get_user(&owner_id).await?;
            Ok::<_, AppError>(user.map(|u| (owner_id, u.email)))
        })
        .buffer_unordered(MAX_CONCURRENT_OPS)
        .collect::<Vec<Result<Option<(String, String)>, AppError>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, AppError>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(drops
        .into_iter()
        .map(|drop| AdminDropView {
            owner_email: owner_emails.get(&drop.owner_id).cloned(),
            expired: drop.is_expired(now),
            views: drop.stats.views,
            file_count: drop.files.len(),
            id: drop.id,
            title: drop.title,
            owner_id: drop.owner_id,
            scope: drop.scope,
            drop_type: drop.drop_type,
            retrieval_mode: drop.retrieval_mode,
            expires_at: drop.expires_at,
            created_at: drop.created_at,
        })
        .collect())
}
