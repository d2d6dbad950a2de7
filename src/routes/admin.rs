// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin console routes. Auth and admin middleware are applied in routes/mod.rs.

use crate::error::Result;
use crate::routes::{ok, parse_body, ApiResponse};
use crate::services::admin::{
    self, AdminDropView, AdminSession, AdminUserView, CascadeOutcome,
};
use crate::services::users::UserView;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/drops", get(list_drops))
        .route("/api/admin/drops/{id}", delete(delete_drop))
        .route("/api/admin/users/{id}", delete(delete_user))
        .route("/api/admin/users/{id}/admin", put(set_admin))
        .route("/api/admin/users/{id}/tier", put(update_tier))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<AdminUserView>>>> {
    let users = admin::list_users_with_drop_counts(state.db.as_ref()).await?;
    Ok(ok(users))
}

async fn list_drops(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<AdminDropView>>>> {
    let drops = admin::list_drops_with_owner_email(state.db.as_ref(), Utc::now()).await?;
    Ok(ok(drops))
}

async fn delete_drop(
    State(state): State<Arc<AppState>>,
    Extension(admin_session): Extension<AdminSession>,
    Path(drop_id): Path<String>,
) -> Result<Json<ApiResponse<CascadeOutcome>>> {
    tracing::info!(admin = %admin_session.uid, drop_id = %drop_id, "Admin drop deletion");
    let outcome =
        admin::delete_drop_cascade(state.db.as_ref(), state.blobs.as_ref(), &drop_id).await?;
    Ok(ok(outcome))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin_session): Extension<AdminSession>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<CascadeOutcome>>> {
    tracing::info!(admin = %admin_session.uid, user_id = %user_id, "Admin user deletion");
    let outcome = admin::delete_user_cascade(
        state.db.as_ref(),
        state.blobs.as_ref(),
        state.identity.as_ref(),
        &user_id,
    )
    .await?;
    Ok(ok(outcome))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetAdminRequest {
    is_admin: bool,
}

async fn set_admin(
    State(state): State<Arc<AppState>>,
    Extension(admin_session): Extension<AdminSession>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<SetAdminRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserView>>> {
    let request = parse_body(payload)?;
    let user = admin::set_admin(
        state.db.as_ref(),
        &admin_session,
        &user_id,
        request.is_admin,
        Utc::now(),
    )
    .await?;
    Ok(ok(user.into()))
}

#[derive(Deserialize)]
struct UpdateTierRequest {
    tier: String,
}

async fn update_tier(
    State(state): State<Arc<AppState>>,
    Extension(admin_session): Extension<AdminSession>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<UpdateTierRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserView>>> {
    let request = parse_body(payload)?;
    let user = admin::update_tier(
        state.db.as_ref(),
        &admin_session,
        &user_id,
        &request.tier,
        Utc::now(),
    )
    .await?;
    Ok(ok(user.into()))
}
