// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Abuse report model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Moderation status. Only `Pending` is ever written by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Dismissed,
}

/// Immutable audit record. `drop_title` and `drop_owner_id` are frozen at
/// creation so the record outlives edits to or deletion of the drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub drop_id: String,
    pub reported_by: String,
    pub reporter_email: String,
    pub category: String,
    pub reason: String,
    #[serde(default)]
    pub details: Option<String>,
    pub drop_title: String,
    pub drop_owner_id: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}
