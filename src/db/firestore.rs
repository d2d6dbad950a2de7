// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, tier, admin flag)
//! - Drops (geo-anchored file bundles, hunt codes, access stats)
//! - Reports (abuse report intake)

use crate::db::{collections, DocumentStore};
use crate::error::AppError;
use crate::models::{Drop, DropType, Report, Scope, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Firestore limits a transaction to 500 writes. A user's drops are bounded
// by the business tier quota (500), so one transaction covers them.
const MAX_TRANSACTION_WRITES: usize = 500;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

/// Projection used for count queries.
#[derive(Deserialize)]
struct DropIdOnly {
    #[allow(dead_code)]
    id: String,
}

/// Partial document written alongside the `stats.views` increment.
#[derive(Serialize, Deserialize)]
struct AccessStamp {
    stats: AccessStampStats,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessStampStats {
    #[serde(with = "firestore::serialize_as_timestamp")]
    last_accessed_at: DateTime<Utc>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Drop Operations ─────────────────────────────────────────

    async fn get_drop(&self, drop_id: &str) -> Result<Option<Drop>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::DROPS)
            .obj()
            .one(drop_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_drop(&self, drop: &Drop) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::DROPS)
            .document_id(&drop.id)
            .object(drop)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_drops(&self) -> Result<Vec<Drop>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::DROPS)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn drops_for_owner(&self, owner_id: &str) -> Result<Vec<Drop>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::DROPS)
            .filter(|q| q.for_all([q.field("ownerId").eq(owner_id)]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn drops_with_scope(&self, scope: Scope) -> Result<Vec<Drop>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::DROPS)
            .filter(|q| q.for_all([q.field("scope").eq(scope.as_str())]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_drops_for_owner(&self, owner_id: &str) -> Result<usize, AppError> {
        let ids: Vec<DropIdOnly> = self
            .client
            .fluent()
            .select()
            .fields(["id"])
            .from(collections::DROPS)
            .filter(|q| q.for_all([q.field("ownerId").eq(owner_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(ids.len())
    }

    async fn find_hunt_by_code(&self, code: &str) -> Result<Option<Drop>, AppError> {
        let matches: Vec<Drop> = self
            .client
            .fluent()
            .select()
            .from(collections::DROPS)
            .filter(|q| {
                q.for_all([
                    q.field("dropType").eq(DropType::Hunt.as_str()),
                    q.field("huntCode").eq(code),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(matches.into_iter().next())
    }

    async fn record_drop_access(
        &self,
        drop_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let client = &self.client;
        let stamp = AccessStamp {
            stats: AccessStampStats {
                last_accessed_at: at,
            },
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Server-side increment so concurrent unlocks never lose a view.
        client
            .fluent()
            .update()
            .fields(["stats.lastAccessedAt"])
            .in_col(collections::DROPS)
            .document_id(drop_id)
            .object(&stamp)
            .transforms(|t| t.fields([t.field("stats.views").increment(1)]))
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add access stamp to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    async fn delete_drop(&self, drop_id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::DROPS)
            .document_id(drop_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_drops_atomic(&self, drop_ids: &[String]) -> Result<(), AppError> {
        if drop_ids.is_empty() {
            return Ok(());
        }
        if drop_ids.len() > MAX_TRANSACTION_WRITES {
            return Err(AppError::Database(format!(
                "Refusing atomic delete of {} documents (limit {})",
                drop_ids.len(),
                MAX_TRANSACTION_WRITES
            )));
        }

        let client = &self.client;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for drop_id in drop_ids {
            client
                .fluent()
                .delete()
                .from(collections::DROPS)
                .document_id(drop_id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add deletion to transaction for {}: {}",
                        collections::DROPS,
                        e
                    ))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit batch deletion: {}", e)))?;

        tracing::debug!(count = drop_ids.len(), "Deleted drop documents atomically");
        Ok(())
    }

    // ─── Report Operations ───────────────────────────────────────

    async fn create_report(&self, report: &Report) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::REPORTS)
            .document_id(&report.id)
            .object(report)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
