// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Drop model for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::has_expired;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A geo-anchored, secret-protected file bundle stored in Firestore.
///
/// `secret` is stored as entered and must never be copied into an API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drop {
    /// Document ID
    pub id: String,
    /// Owning user's uid
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Shared unlock phrase
    pub secret: String,
    pub coords: Coords,
    /// Geofence radius in meters
    pub geofence_radius_m: f64,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub drop_type: DropType,
    /// Uppercase join code, present iff `drop_type` is `Hunt`
    #[serde(default)]
    pub hunt_code: Option<String>,
    #[serde(default)]
    pub hunt_difficulty: Option<HuntDifficulty>,
    #[serde(default)]
    pub retrieval_mode: RetrievalMode,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: Vec<DropFile>,
    #[serde(default)]
    pub stats: DropStats,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Drop {
    /// Soft expiry: an expired drop is treated as gone by every operation.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        has_expired(self.expires_at, now)
    }

    pub fn is_hunt(&self) -> bool {
        self.drop_type == DropType::Hunt
    }

    /// Total size of all attached files in megabytes.
    pub fn total_file_size_mb(&self) -> f64 {
        total_size_mb(self.files.iter().map(|f| f.size_bytes))
    }
}

/// Sum byte counts and convert to megabytes.
pub fn total_size_mb(sizes: impl IntoIterator<Item = u64>) -> f64 {
    sizes.into_iter().map(|b| b as f64).sum::<f64>() / BYTES_PER_MB
}

/// WGS84 coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Coords {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<Coords> for geo::Point<f64> {
    fn from(c: Coords) -> Self {
        // geo uses (x, y) = (longitude, latitude)
        geo::Point::new(c.lng, c.lat)
    }
}

/// Reference to an uploaded file. Blob storage owns the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DropFile {
    /// Object path inside the storage bucket
    pub path: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub size_bytes: u64,
}

/// Access counters, updated on every successful unlock or hunt join.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropStats {
    #[serde(default)]
    pub views: u64,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Scope {
    #[default]
    Public,
    Private,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Public => "public",
            Scope::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DropType {
    #[default]
    Normal,
    Hunt,
}

impl DropType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropType::Normal => "normal",
            DropType::Hunt => "hunt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RetrievalMode {
    /// Secret alone unlocks
    #[default]
    Remote,
    /// Secret plus presence inside the geofence
    Physical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum HuntDifficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}
