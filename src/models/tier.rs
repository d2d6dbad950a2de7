// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Subscription tiers and the limits derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Subscription level bounding what a user's drops may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Tier {
    #[default]
    Free,
    Premium,
    /// Also accepted as "paid" on input.
    #[serde(alias = "paid")]
    Business,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Business => "business",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            "business" | "paid" => Ok(Tier::Business),
            _ => Err(TierError::InvalidTier(s.to_string())),
        }
    }
}

/// Errors from tier handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    #[error("Invalid tier '{0}': expected one of free, premium, business")]
    InvalidTier(String),
}

/// Capabilities granted by a tier. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TierLimits {
    #[serde(rename = "maxFileSizeMB")]
    pub max_file_size_mb: u32,
    pub default_expiry_days: u32,
    pub min_radius_m: u32,
    pub max_radius_m: u32,
    pub can_use_private_spots: bool,
    pub can_use_physical_mode: bool,
    pub max_drops: u32,
}
