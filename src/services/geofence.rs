// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence unlock protocol.
//!
//! The decision order is fixed so a caller learns nothing from which check
//! failed first:
//! 1. expiry
//! 2. secret
//! 3. retrieval mode (remote unlocks here)
//! 4. distance to the drop (physical mode only)

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{Coords, Drop, DropFile, RetrievalMode};
use chrono::{DateTime, Utc};
use geo::{Distance, HaversineMeasure};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use validator::Validate;

/// Spherical Earth radius used for geofence checks (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two coordinates.
pub fn distance_m(a: Coords, b: Coords) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_M).distance(geo::Point::from(a), geo::Point::from(b))
}

/// Exact-match comparison that takes the same time wherever the inputs differ.
///
/// Both sides are hashed first so the comparison length does not depend on
/// the stored secret's length.
pub fn secrets_match(submitted: &str, stored: &str) -> bool {
    let submitted = Sha256::digest(submitted.as_bytes());
    let stored = Sha256::digest(stored.as_bytes());
    submitted.as_slice().ct_eq(stored.as_slice()).into()
}

/// Why an unlock attempt was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnlockError {
    #[error("This drop has expired")]
    Expired,

    #[error("Incorrect secret")]
    InvalidSecret,

    #[error("Your location is required to unlock this drop")]
    MissingLocation,

    #[error("You are not within range of this drop")]
    OutOfRange { distance_m: f64, radius_m: f64 },
}

impl UnlockError {
    /// Map to an API error. The measured distance is only included when
    /// `disclose_distance` is set.
    pub fn into_app_error(self, disclose_distance: bool) -> AppError {
        match self {
            UnlockError::Expired => AppError::Expired(self.to_string()),
            UnlockError::InvalidSecret => AppError::Forbidden(self.to_string()),
            UnlockError::MissingLocation => AppError::BadRequest(self.to_string()),
            UnlockError::OutOfRange {
                distance_m,
                radius_m,
            } => {
                if disclose_distance {
                    AppError::Forbidden(format!(
                        "{} ({:.0}m away, radius {:.0}m)",
                        self, distance_m, radius_m
                    ))
                } else {
                    AppError::Forbidden(self.to_string())
                }
            }
        }
    }
}

/// Submitted unlock credentials.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UnlockAttempt {
    pub secret: String,
    /// Out-of-range coordinates would wrap in the haversine formula.
    #[serde(default)]
    #[validate(nested)]
    pub coords: Option<Coords>,
}

/// Files released by a successful unlock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockGrant {
    pub drop_id: String,
    pub title: String,
    pub files: Vec<DropFile>,
}

/// Pure unlock decision.
pub fn evaluate_unlock(
    drop: &Drop,
    attempt: &UnlockAttempt,
    now: DateTime<Utc>,
) -> Result<(), UnlockError> {
    if drop.is_expired(now) {
        return Err(UnlockError::Expired);
    }

    if !secrets_match(&attempt.secret, &drop.secret) {
        return Err(UnlockError::InvalidSecret);
    }

    match drop.retrieval_mode {
        RetrievalMode::Remote => Ok(()),
        RetrievalMode::Physical => {
            let location = attempt.coords.ok_or(UnlockError::MissingLocation)?;
            let distance = distance_m(location, drop.coords);
            if distance <= drop.geofence_radius_m {
                Ok(())
            } else {
                Err(UnlockError::OutOfRange {
                    distance_m: distance,
                    radius_m: drop.geofence_radius_m,
                })
            }
        }
    }
}

/// Run the unlock protocol against a stored drop.
///
/// Malformed coordinates are rejected before the drop is read. On success
/// the drop's access stats are updated exactly once.
pub async fn unlock_drop(
    db: &dyn DocumentStore,
    drop_id: &str,
    attempt: &UnlockAttempt,
    now: DateTime<Utc>,
    disclose_distance: bool,
) -> Result<UnlockGrant, AppError> {
    attempt.validate()?;

    let drop = db
        .get_drop(drop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Drop {} not found", drop_id)))?;

    if let Err(err) = evaluate_unlock(&drop, attempt, now) {
        if let UnlockError::OutOfRange { distance_m, .. } = &err {
            tracing::debug!(drop_id, distance_m, "Unlock refused: out of range");
        } else {
            tracing::debug!(drop_id, reason = %err, "Unlock refused");
        }
        return Err(err.into_app_error(disclose_distance));
    }

    db.record_drop_access(&drop.id, now).await?;

    tracing::info!(
        drop_id,
        mode = ?drop.retrieval_mode,
        files = drop.files.len(),
        "Drop unlocked"
    );

    Ok(UnlockGrant {
        drop_id: drop.id,
        title: drop.title,
        files: drop.files,
    })
}
