// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod admin;
pub mod blob;
pub mod drops;
pub mod gcp_auth;
pub mod geofence;
pub mod hunt;
pub mod identity;
pub mod report;
pub mod tier;
pub mod users;

pub use admin::{AdminSession, CascadeOutcome, CleanupWarning};
pub use blob::{BlobStore, GcsBlobStore, MemoryBlobStore};
pub use identity::{IdentityProvider, IdentityToolkitClient, JwtIdentityProvider, Session};
