//! Database layer (Firestore, with an in-memory backend for local runs and tests).

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Drop, Report, Scope, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const DROPS: &str = "drops";
    pub const REPORTS: &str = "reports";
}

/// Document store contract used by every service.
///
/// Listings are ordered by `createdAt` descending. Each single-document
/// write is atomic; `delete_drops_atomic` is all-or-nothing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError>;
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn delete_user(&self, uid: &str) -> Result<(), AppError>;

    // ─── Drops ───────────────────────────────────────────────────
    async fn get_drop(&self, drop_id: &str) -> Result<Option<Drop>, AppError>;
    async fn set_drop(&self, drop: &Drop) -> Result<(), AppError>;
    async fn list_drops(&self) -> Result<Vec<Drop>, AppError>;
    async fn drops_for_owner(&self, owner_id: &str) -> Result<Vec<Drop>, AppError>;
    async fn drops_with_scope(&self, scope: Scope) -> Result<Vec<Drop>, AppError>;
    async fn count_drops_for_owner(&self, owner_id: &str) -> Result<usize, AppError>;
    /// First hunt drop whose (uppercase) code equals `code`.
    async fn find_hunt_by_code(&self, code: &str) -> Result<Option<Drop>, AppError>;
    /// Increment `stats.views` by one and stamp `stats.lastAccessedAt`.
    async fn record_drop_access(&self, drop_id: &str, at: DateTime<Utc>)
        -> Result<(), AppError>;
    async fn delete_drop(&self, drop_id: &str) -> Result<(), AppError>;
    /// Delete all listed drop documents in one transaction.
    async fn delete_drops_atomic(&self, drop_ids: &[String]) -> Result<(), AppError>;

    // ─── Reports ─────────────────────────────────────────────────
    async fn create_report(&self, report: &Report) -> Result<(), AppError>;
}
