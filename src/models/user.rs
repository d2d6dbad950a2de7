//! User model for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Tier;

/// User profile stored in Firestore.
///
/// Created on first successful authentication. `tier` and `is_admin` are
/// only changed by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity-provider uid (also used as document ID)
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New free-tier, non-admin user.
    pub fn new(uid: &str, email: &str, now: DateTime<Utc>) -> Self {
        let display_name = email.split('@').next().unwrap_or_default().to_string();
        Self {
            uid: uid.to_string(),
            email: email.to_string(),
            display_name,
            tier: Tier::Free,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}
