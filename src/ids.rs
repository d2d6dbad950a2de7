// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random identifiers drawn from the OS CSPRNG.

use crate::error::AppError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};

/// 15 random bytes encode to exactly 20 URL-safe characters.
const DOCUMENT_ID_BYTES: usize = 15;

/// Generate a new document ID (20 URL-safe base64 characters).
pub fn new_document_id(rng: &(dyn SecureRandom + Sync)) -> Result<String, AppError> {
    let mut bytes = [0u8; DOCUMENT_ID_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Shared system RNG. `SystemRandom` is stateless, so a fresh one is cheap.
pub fn system_rng() -> SystemRandom {
    SystemRandom::new()
}
