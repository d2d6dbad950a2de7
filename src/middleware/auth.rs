// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and admin middleware.

use crate::error::AppError;
use crate::services::admin::require_admin;
use crate::services::identity::Session;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that requires a resolvable identity.
///
/// Creates the request's `Session`; it lives in the request extensions
/// and is dropped with the request.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = state
        .identity
        .resolve(request.headers())
        .await
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(Session::new(identity));

    Ok(next.run(request).await)
}

/// Middleware for admin-only routes. Must run after `require_auth`.
pub async fn require_admin_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = request.extensions().get::<Session>().cloned();
    let admin = require_admin(state.db.as_ref(), session.as_ref()).await?;
    request.extensions_mut().insert(admin);

    Ok(next.run(request).await)
}
