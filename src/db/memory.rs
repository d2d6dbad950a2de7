// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store for local development and tests.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{Drop, Report, Scope, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// DashMap-backed store. Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    drops: Arc<DashMap<String, Drop>>,
    reports: Arc<DashMap<String, Report>>,
    /// Serializes multi-document deletes so they appear atomic.
    batch_lock: Arc<Mutex<()>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored reports (moderation is handled elsewhere; used by tests).
    pub fn reports(&self) -> Vec<Report> {
        self.reports.iter().map(|r| r.value().clone()).collect()
    }
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl DocumentStore for MemoryDb {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(uid).map(|u| u.value().clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = self.users.iter().map(|u| u.value().clone()).collect();
        Ok(newest_first(users, |u: &User| u.created_at))
    }

    async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        self.users.remove(uid);
        Ok(())
    }

    async fn get_drop(&self, drop_id: &str) -> Result<Option<Drop>, AppError> {
        Ok(self.drops.get(drop_id).map(|d| d.value().clone()))
    }

    async fn set_drop(&self, drop: &Drop) -> Result<(), AppError> {
        self.drops.insert(drop.id.clone(), drop.clone());
        Ok(())
    }

    async fn list_drops(&self) -> Result<Vec<Drop>, AppError> {
        let drops = self.drops.iter().map(|d| d.value().clone()).collect();
        Ok(newest_first(drops, |d: &Drop| d.created_at))
    }

    async fn drops_for_owner(&self, owner_id: &str) -> Result<Vec<Drop>, AppError> {
        let drops = self
            .drops
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .map(|d| d.value().clone())
            .collect();
        Ok(newest_first(drops, |d: &Drop| d.created_at))
    }

    async fn drops_with_scope(&self, scope: Scope) -> Result<Vec<Drop>, AppError> {
        let drops = self
            .drops
            .iter()
            .filter(|d| d.scope == scope)
            .map(|d| d.value().clone())
            .collect();
        Ok(newest_first(drops, |d: &Drop| d.created_at))
    }

    async fn count_drops_for_owner(&self, owner_id: &str) -> Result<usize, AppError> {
        Ok(self.drops.iter().filter(|d| d.owner_id == owner_id).count())
    }

    async fn find_hunt_by_code(&self, code: &str) -> Result<Option<Drop>, AppError> {
        Ok(self
            .drops
            .iter()
            .find(|d| d.is_hunt() && d.hunt_code.as_deref() == Some(code))
            .map(|d| d.value().clone()))
    }

    async fn record_drop_access(
        &self,
        drop_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut drop = self
            .drops
            .get_mut(drop_id)
            .ok_or_else(|| AppError::Database(format!("No drop document {}", drop_id)))?;
        drop.stats.views += 1;
        drop.stats.last_accessed_at = Some(at);
        Ok(())
    }

    async fn delete_drop(&self, drop_id: &str) -> Result<(), AppError> {
        self.drops.remove(drop_id);
        Ok(())
    }

    async fn delete_drops_atomic(&self, drop_ids: &[String]) -> Result<(), AppError> {
        let _guard = self.batch_lock.lock().await;
        for drop_id in drop_ids {
            self.drops.remove(drop_id);
        }
        Ok(())
    }

    async fn create_report(&self, report: &Report) -> Result<(), AppError> {
        self.reports.insert(report.id.clone(), report.clone());
        Ok(())
    }
}
