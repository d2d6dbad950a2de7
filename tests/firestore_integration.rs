// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST). They are skipped otherwise.

use chrono::{Duration, Utc};
use geodrop::db::DocumentStore;
use geodrop::models::{DropType, Scope, Tier, User};

mod common;
use common::{drop_fixture, file, test_db, unique_id};

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");

    assert!(db.get_user(&uid).await.unwrap().is_none());

    let mut user = User::new(&uid, "trail@example.com", Utc::now());
    user.tier = Tier::Premium;
    db.upsert_user(&user).await.unwrap();

    let stored = db.get_user(&uid).await.unwrap().expect("user stored");
    assert_eq!(stored.email, "trail@example.com");
    assert_eq!(stored.tier, Tier::Premium);
    assert!(!stored.is_admin);

    db.delete_user(&uid).await.unwrap();
    assert!(db.get_user(&uid).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// DROP TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_drop_round_trip_and_owner_queries() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_id("owner");
    let first = unique_id("drop");
    let second = unique_id("drop");

    let mut older = drop_fixture(&first, &owner);
    older.created_at = Utc::now() - Duration::hours(1);
    older.files = vec![file("drops/x/a.txt")];
    db.set_drop(&older).await.unwrap();
    db.set_drop(&drop_fixture(&second, &owner)).await.unwrap();

    let stored = db.get_drop(&first).await.unwrap().expect("drop stored");
    assert_eq!(stored.files.len(), 1);
    assert_eq!(stored.expires_at.map(|t| t.timestamp()), older.expires_at.map(|t| t.timestamp()));

    let owned = db.drops_for_owner(&owner).await.unwrap();
    let ids: Vec<&str> = owned.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    assert_eq!(db.count_drops_for_owner(&owner).await.unwrap(), 2);

    db.delete_drops_atomic(&[first.clone(), second.clone()])
        .await
        .unwrap();
    assert_eq!(db.count_drops_for_owner(&owner).await.unwrap(), 0);
}

#[tokio::test]
async fn test_drops_with_scope_filters_on_scope() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_id("owner");
    let public_id = unique_id("drop");
    let private_id = unique_id("drop");

    db.set_drop(&drop_fixture(&public_id, &owner)).await.unwrap();
    let mut private = drop_fixture(&private_id, &owner);
    private.scope = Scope::Private;
    db.set_drop(&private).await.unwrap();

    let public = db.drops_with_scope(Scope::Public).await.unwrap();
    assert!(public.iter().any(|d| d.id == public_id));
    assert!(public.iter().all(|d| d.scope == Scope::Public));

    let private = db.drops_with_scope(Scope::Private).await.unwrap();
    assert!(private.iter().any(|d| d.id == private_id));

    db.delete_drops_atomic(&[public_id, private_id]).await.unwrap();
}

#[tokio::test]
async fn test_record_drop_access_increments() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("drop");
    db.set_drop(&drop_fixture(&id, "someone")).await.unwrap();

    let now = Utc::now();
    db.record_drop_access(&id, now).await.unwrap();
    db.record_drop_access(&id, now).await.unwrap();

    let stored = db.get_drop(&id).await.unwrap().unwrap();
    assert_eq!(stored.stats.views, 2);
    assert!(stored.stats.last_accessed_at.is_some());

    db.delete_drop(&id).await.unwrap();
}

#[tokio::test]
async fn test_find_hunt_by_code() {
    require_emulator!();

    let db = test_db().await;
    let id = unique_id("hunt");
    // Codes are shared across runs; derive one from the unique id.
    let code: String = id
        .chars()
        .rev()
        .filter(|c| c.is_ascii_digit())
        .take(6)
        .collect();

    let mut drop = drop_fixture(&id, "someone");
    drop.drop_type = DropType::Hunt;
    drop.hunt_code = Some(code.clone());
    db.set_drop(&drop).await.unwrap();

    let found = db.find_hunt_by_code(&code).await.unwrap().expect("hunt found");
    assert_eq!(found.id, id);

    db.delete_drop(&id).await.unwrap();
}
