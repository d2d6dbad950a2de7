// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tier policy engine: pure rules over a tier's limits.

use crate::models::{Tier, TierLimits};
use serde::Serialize;

const FREE: TierLimits = TierLimits {
    max_file_size_mb: 500,
    default_expiry_days: 30,
    min_radius_m: 50,
    max_radius_m: 500,
    can_use_private_spots: false,
    can_use_physical_mode: false,
    max_drops: 10,
};

const PREMIUM: TierLimits = TierLimits {
    max_file_size_mb: 2048,
    default_expiry_days: 90,
    min_radius_m: 10,
    max_radius_m: 1000,
    can_use_private_spots: true,
    can_use_physical_mode: true,
    max_drops: 100,
};

const BUSINESS: TierLimits = TierLimits {
    max_file_size_mb: 10240,
    default_expiry_days: 365,
    min_radius_m: 5,
    max_radius_m: 5000,
    can_use_private_spots: true,
    can_use_physical_mode: true,
    max_drops: 500,
};

/// Limits for a tier.
pub fn tier_limits(tier: Tier) -> TierLimits {
    match tier {
        Tier::Free => FREE,
        Tier::Premium => PREMIUM,
        Tier::Business => BUSINESS,
    }
}

/// True iff an owner holding `current_drop_count` drops may create another.
pub fn can_create_drop(tier: Tier, current_drop_count: usize) -> bool {
    current_drop_count < tier_limits(tier).max_drops as usize
}

/// A single violated tier constraint.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TierViolation {
    #[error("File size {size_mb:.1}MB exceeds the {tier} tier limit of {max_mb}MB")]
    FileTooLarge { tier: Tier, size_mb: f64, max_mb: u32 },

    #[error("Radius {radius_m}m is below the {tier} tier minimum of {min_m}m")]
    RadiusBelowMinimum { tier: Tier, radius_m: f64, min_m: u32 },

    #[error("Radius {radius_m}m exceeds the {tier} tier maximum of {max_m}m")]
    RadiusAboveMaximum { tier: Tier, radius_m: f64, max_m: u32 },

    #[error("Private spots are not available on the {tier} tier")]
    PrivateSpotsUnavailable { tier: Tier },

    #[error("Physical retrieval mode is not available on the {tier} tier")]
    PhysicalModeUnavailable { tier: Tier },
}

/// Outcome of checking a drop against a tier. `valid == errors.is_empty()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierValidation {
    pub valid: bool,
    pub errors: Vec<TierViolation>,
}

impl TierValidation {
    /// Human-readable messages, one per violation.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Check every tier constraint and collect all violations.
///
/// Inputs are assumed finite and non-negative; request validation rejects
/// anything else before this point.
pub fn validate_drop_for_tier(
    tier: Tier,
    file_size_mb: f64,
    radius_m: f64,
    is_private_spot: bool,
    is_physical_mode: bool,
) -> TierValidation {
    let limits = tier_limits(tier);
    let mut errors = Vec::new();

    if file_size_mb > f64::from(limits.max_file_size_mb) {
        errors.push(TierViolation::FileTooLarge {
            tier,
            size_mb: file_size_mb,
            max_mb: limits.max_file_size_mb,
        });
    }

    if radius_m < f64::from(limits.min_radius_m) {
        errors.push(TierViolation::RadiusBelowMinimum {
            tier,
            radius_m,
            min_m: limits.min_radius_m,
        });
    } else if radius_m > f64::from(limits.max_radius_m) {
        errors.push(TierViolation::RadiusAboveMaximum {
            tier,
            radius_m,
            max_m: limits.max_radius_m,
        });
    }

    if is_private_spot && !limits.can_use_private_spots {
        errors.push(TierViolation::PrivateSpotsUnavailable { tier });
    }

    if is_physical_mode && !limits.can_use_physical_mode {
        errors.push(TierViolation::PhysicalModeUnavailable { tier });
    }

    TierValidation {
        valid: errors.is_empty(),
        errors,
    }
}
