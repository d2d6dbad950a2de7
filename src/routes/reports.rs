// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report submission.

use crate::error::Result;
use crate::models::ReportStatus;
use crate::routes::{ok, parse_body, ApiResponse};
use crate::services::identity::Session;
use crate::services::report::{create_report, CreateReportInput};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/reports", post(submit_report))
}

/// Acknowledgement returned to the reporter.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReportReceipt {
    pub id: String,
    pub status: ReportStatus,
}

async fn submit_report(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    payload: std::result::Result<Json<CreateReportInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReportReceipt>>)> {
    let input = parse_body(payload)?;

    let report = create_report(state.db.as_ref(), &state.rng, &session, input, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        ok(ReportReceipt {
            id: report.id,
            status: report.status,
        }),
    ))
}
