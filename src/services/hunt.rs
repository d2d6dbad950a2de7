// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hunt codes: format checks, generation, and join-by-code.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::HuntDifficulty;
use chrono::{DateTime, Utc};
use ring::rand::SecureRandom;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Every hunt code is exactly this many ASCII alphanumerics.
pub const HUNT_CODE_LEN: usize = 6;

const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
// Largest multiple of 36 below 256; bytes at or above it are rejected to
// keep the draw uniform.
const REJECTION_LIMIT: u8 = 252;
const MAX_GENERATION_ATTEMPTS: usize = 8;

/// Format check only. Case is ignored.
pub fn is_valid_hunt_code(code: &str) -> bool {
    code.len() == HUNT_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Canonical (uppercase) form used for storage and lookup.
pub fn normalize_hunt_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Draw a fresh code from `[A-Z0-9]`.
pub fn generate_hunt_code(rng: &(dyn SecureRandom + Sync)) -> Result<String, AppError> {
    let mut code = String::with_capacity(HUNT_CODE_LEN);
    let mut buf = [0u8; 16];

    while code.len() < HUNT_CODE_LEN {
        rng.fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        for &byte in buf.iter().filter(|&&b| b < REJECTION_LIMIT) {
            if code.len() == HUNT_CODE_LEN {
                break;
            }
            code.push(CODE_ALPHABET[usize::from(byte) % CODE_ALPHABET.len()] as char);
        }
    }

    Ok(code)
}

/// Pick the code for a new hunt drop.
///
/// A requested code must be well-formed and not held by a live hunt.
/// Without one, a code is generated, retrying on collision.
pub async fn assign_hunt_code(
    db: &dyn DocumentStore,
    rng: &(dyn SecureRandom + Sync),
    requested: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    if let Some(requested) = requested {
        let code = normalize_hunt_code(requested);
        if !is_valid_hunt_code(&code) {
            return Err(AppError::Validation(vec![invalid_format_message()]));
        }
        if code_in_use(db, &code, now).await? {
            return Err(AppError::Validation(vec![format!(
                "hunt_code: {} is already in use",
                code
            )]));
        }
        return Ok(code);
    }

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let code = generate_hunt_code(rng)?;
        if !code_in_use(db, &code, now).await? {
            return Ok(code);
        }
        tracing::debug!(attempt, "Generated hunt code collided, retrying");
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "Could not generate a unique hunt code after {} attempts",
        MAX_GENERATION_ATTEMPTS
    )))
}

/// Codes held by expired hunts are free to reuse.
async fn code_in_use(
    db: &dyn DocumentStore,
    code: &str,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    Ok(db
        .find_hunt_by_code(code)
        .await?
        .is_some_and(|d| !d.is_expired(now)))
}

fn invalid_format_message() -> String {
    format!(
        "hunt_code: must be exactly {} letters or digits",
        HUNT_CODE_LEN
    )
}

/// Why a join was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Hunt codes are exactly 6 letters or digits")]
    InvalidFormat,

    #[error("No hunt found for that code")]
    NotFound,

    #[error("This hunt has expired")]
    Expired,
}

impl From<JoinError> for AppError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::InvalidFormat => AppError::BadRequest(err.to_string()),
            JoinError::NotFound => AppError::NotFound(err.to_string()),
            JoinError::Expired => AppError::Expired(err.to_string()),
        }
    }
}

/// What a joiner learns about a hunt. Never carries the secret or files.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HuntSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: HuntDifficulty,
}

/// Look up a hunt by its code and record the visit.
pub async fn join_hunt_by_code(
    db: &dyn DocumentStore,
    code: &str,
    requester_id: &str,
    now: DateTime<Utc>,
) -> Result<HuntSummary, AppError> {
    let code = normalize_hunt_code(code);
    if !is_valid_hunt_code(&code) {
        return Err(JoinError::InvalidFormat.into());
    }

    let drop = db.find_hunt_by_code(&code).await?.ok_or(JoinError::NotFound)?;

    if drop.is_expired(now) {
        return Err(JoinError::Expired.into());
    }

    db.record_drop_access(&drop.id, now).await?;

    tracing::info!(drop_id = %drop.id, requester_id, "Hunt joined");

    Ok(HuntSummary {
        id: drop.id,
        title: drop.title,
        description: drop.description,
        difficulty: drop.hunt_difficulty.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::system_rng;

    #[test]
    fn test_hunt_code_format() {
        assert!(is_valid_hunt_code("AB12CD"));
        assert!(is_valid_hunt_code("ab12cd"));
        assert!(!is_valid_hunt_code("AB12"));
        assert!(!is_valid_hunt_code("AB12CDE"));
        assert!(!is_valid_hunt_code("AB-2CD"));
        assert!(!is_valid_hunt_code("ÄB12CD"));
        assert!(!is_valid_hunt_code(""));
    }

    #[test]
    fn test_normalize_hunt_code() {
        assert_eq!(normalize_hunt_code(" ab12cd "), "AB12CD");
    }

    #[test]
    fn test_generated_codes_are_valid_uppercase() {
        let rng = system_rng();
        for _ in 0..100 {
            let code = generate_hunt_code(&rng).unwrap();
            assert!(is_valid_hunt_code(&code), "{code}");
            assert_eq!(code, code.to_ascii_uppercase());
        }
    }

    #[test]
    fn test_join_error_status() {
        use axum::http::StatusCode;
        assert_eq!(
            AppError::from(JoinError::InvalidFormat).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(JoinError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::from(JoinError::Expired).status(), StatusCode::GONE);
    }
}
