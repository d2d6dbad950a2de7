//! User provisioning and the caller's profile.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{Tier, TierLimits, User};
use crate::services::identity::Session;
use crate::services::tier::tier_limits;
use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Fetch the caller's user record, creating a free-tier one on first use.
pub async fn get_or_create_user(
    db: &dyn DocumentStore,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    if let Some(user) = db.get_user(&session.uid).await? {
        return Ok(user);
    }

    let user = User::new(&session.uid, &session.email, now);
    db.upsert_user(&user).await?;
    tracing::info!(uid = %user.uid, "Created user on first authentication");
    Ok(user)
}

/// User as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserView {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub tier: Tier,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            tier: user.tier,
            is_admin: user.is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Current user with the limits of their tier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub user: UserView,
    pub limits: TierLimits,
    pub drop_count: usize,
}

pub async fn get_me(
    db: &dyn DocumentStore,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<MeResponse, AppError> {
    let user = get_or_create_user(db, session, now).await?;
    let drop_count = db.count_drops_for_owner(&user.uid).await?;

    Ok(MeResponse {
        limits: tier_limits(user.tier),
        drop_count,
        user: user.into(),
    })
}
