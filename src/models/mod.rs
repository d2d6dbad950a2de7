// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod drop;
pub mod report;
pub mod tier;
pub mod user;

pub use drop::{
    total_size_mb, Coords, Drop, DropFile, DropStats, DropType, HuntDifficulty, RetrievalMode,
    Scope,
};
pub use report::{Report, ReportStatus};
pub use tier::{Tier, TierError, TierLimits};
pub use user::User;
