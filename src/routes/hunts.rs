// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use crate::error::Result;
use crate::routes::{ok, parse_body, ApiResponse};
use crate::services::hunt::{join_hunt_by_code, HuntSummary};
use crate::services::identity::Session;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/hunts/join", post(join))
}

#[derive(Deserialize)]
struct JoinRequest {
    code: String,
}

async fn join(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    payload: std::result::Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<HuntSummary>>> {
    let request = parse_body(payload)?;
    let hunt =
        join_hunt_by_code(state.db.as_ref(), &request.code, &session.uid, Utc::now()).await?;
    Ok(ok(hunt))
}
