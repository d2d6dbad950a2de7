// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report intake.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::ids::new_document_id;
use crate::models::{Report, ReportStatus};
use crate::services::identity::Session;
use chrono::{DateTime, Utc};
use ring::rand::SecureRandom;
use serde::Deserialize;
use validator::Validate;

/// Report submission.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    #[validate(length(min = 1, max = 128))]
    pub drop_id: String,
    #[validate(length(max = 64))]
    pub category: String,
    #[validate(length(max = 500))]
    pub reason: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub details: Option<String>,
}

/// Record a pending report against a live drop.
pub async fn create_report(
    db: &dyn DocumentStore,
    rng: &(dyn SecureRandom + Sync),
    session: &Session,
    input: CreateReportInput,
    now: DateTime<Utc>,
) -> Result<Report, AppError> {
    let mut errors = match input.validate() {
        Ok(()) => Vec::new(),
        Err(e) => match AppError::from(e) {
            AppError::Validation(messages) => messages,
            other => return Err(other),
        },
    };
    if input.category.trim().is_empty() {
        errors.push("category: required".to_string());
    }
    if input.reason.trim().is_empty() {
        errors.push("reason: required".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let drop = db
        .get_drop(&input.drop_id)
        .await?
        .filter(|d| !d.is_expired(now))
        .ok_or_else(|| AppError::NotFound(format!("Drop {} not found", input.drop_id)))?;

    let report = Report {
        id: new_document_id(rng)?,
        drop_id: drop.id,
        reported_by: session.uid.clone(),
        reporter_email: session.email.clone(),
        category: input.category.trim().to_string(),
        reason: input.reason.trim().to_string(),
        details: input
            .details
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        drop_title: drop.title,
        drop_owner_id: drop.owner_id,
        status: ReportStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    db.create_report(&report).await?;

    tracing::info!(
        report_id = %report.id,
        drop_id = %report.drop_id,
        category = %report.category,
        "Report created"
    );

    Ok(report)
}
