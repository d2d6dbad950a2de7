// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile, drops, and unlocking.

use crate::error::Result;
use crate::routes::{ok, parse_body, ApiResponse};
use crate::services::admin::CascadeOutcome;
use crate::services::drops::{
    self, CreateDropRequest, OwnerDropView, PublicDropView, UpdateDropRequest,
};
use crate::services::geofence::{unlock_drop, UnlockAttempt, UnlockGrant};
use crate::services::identity::Session;
use crate::services::users::{get_me, MeResponse};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/drops", post(create_drop).get(list_public_drops))
        .route("/api/drops/mine", get(list_my_drops))
        .route("/api/drops/{id}", axum::routing::patch(update_drop).delete(delete_drop))
        .route("/api/drops/{id}/unlock", post(unlock))
}

// ─── User Profile ────────────────────────────────────────────

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<MeResponse>>> {
    let me = get_me(state.db.as_ref(), &session, Utc::now()).await?;
    Ok(ok(me))
}

// ─── Drops ───────────────────────────────────────────────────

async fn create_drop(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    payload: std::result::Result<Json<CreateDropRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OwnerDropView>>)> {
    let request = parse_body(payload)?;
    let now = Utc::now();

    let drop = drops::create_drop(state.db.as_ref(), &state.rng, &session, request, now).await?;

    Ok((StatusCode::CREATED, ok(OwnerDropView::new(drop, now))))
}

async fn list_public_drops(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PublicDropView>>>> {
    let drops = drops::list_public_drops(state.db.as_ref(), Utc::now()).await?;
    Ok(ok(drops))
}

async fn list_my_drops(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<ApiResponse<Vec<OwnerDropView>>>> {
    let drops = drops::list_my_drops(state.db.as_ref(), &session, Utc::now()).await?;
    Ok(ok(drops))
}

async fn update_drop(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(drop_id): Path<String>,
    payload: std::result::Result<Json<UpdateDropRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OwnerDropView>>> {
    let patch = parse_body(payload)?;
    let now = Utc::now();

    let drop = drops::update_drop(state.db.as_ref(), &session, &drop_id, patch, now).await?;

    Ok(ok(OwnerDropView::new(drop, now)))
}

async fn delete_drop(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(drop_id): Path<String>,
) -> Result<Json<ApiResponse<CascadeOutcome>>> {
    let outcome = drops::delete_own_drop(
        state.db.as_ref(),
        state.blobs.as_ref(),
        &session,
        &drop_id,
    )
    .await?;
    Ok(ok(outcome))
}

// ─── Unlock ──────────────────────────────────────────────────

async fn unlock(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(drop_id): Path<String>,
    payload: std::result::Result<Json<UnlockAttempt>, JsonRejection>,
) -> Result<Json<ApiResponse<UnlockGrant>>> {
    let attempt = parse_body(payload)?;
    tracing::debug!(drop_id = %drop_id, uid = %session.uid, "Unlock attempt");

    let grant = unlock_drop(
        state.db.as_ref(),
        &drop_id,
        &attempt,
        Utc::now(),
        state.config.disclose_unlock_distance,
    )
    .await?;

    Ok(ok(grant))
}
