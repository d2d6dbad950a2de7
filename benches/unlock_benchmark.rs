use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use geodrop::models::{Coords, Drop, DropStats, DropType, RetrievalMode, Scope, Tier};
use geodrop::services::geofence::{distance_m, evaluate_unlock, UnlockAttempt};
use geodrop::services::tier::validate_drop_for_tier;
use std::hint::black_box;

fn physical_drop() -> Drop {
    let now = Utc::now();
    Drop {
        id: "bench".to_string(),
        owner_id: "owner".to_string(),
        title: "Bench".to_string(),
        description: None,
        secret: "correct horse battery staple".to_string(),
        coords: Coords::new(37.3318, -122.0312),
        geofence_radius_m: 100.0,
        scope: Scope::Public,
        drop_type: DropType::Normal,
        hunt_code: None,
        hunt_difficulty: None,
        retrieval_mode: RetrievalMode::Physical,
        expires_at: Some(now + Duration::days(30)),
        files: vec![],
        stats: DropStats::default(),
        created_at: now,
        updated_at: now,
    }
}

fn benchmark_unlock(c: &mut Criterion) {
    let drop = physical_drop();
    let now = Utc::now();

    let inside = UnlockAttempt {
        secret: drop.secret.clone(),
        coords: Some(Coords::new(37.3319, -122.0313)),
    };
    let outside = UnlockAttempt {
        secret: drop.secret.clone(),
        coords: Some(Coords::new(37.40, -122.10)),
    };
    let wrong_secret = UnlockAttempt {
        secret: "correct horse battery stapler".to_string(),
        coords: None,
    };

    let mut group = c.benchmark_group("unlock_decision");

    group.bench_function("inside_geofence", |b| {
        b.iter(|| evaluate_unlock(black_box(&drop), black_box(&inside), now))
    });

    group.bench_function("outside_geofence", |b| {
        b.iter(|| evaluate_unlock(black_box(&drop), black_box(&outside), now))
    });

    group.bench_function("wrong_secret", |b| {
        b.iter(|| evaluate_unlock(black_box(&drop), black_box(&wrong_secret), now))
    });

    group.finish();

    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            distance_m(
                black_box(Coords::new(37.3318, -122.0312)),
                black_box(Coords::new(51.5074, -0.1278)),
            )
        })
    });

    c.bench_function("tier_validation_all_violations", |b| {
        b.iter(|| validate_drop_for_tier(black_box(Tier::Free), 900.0, 10.0, true, true))
    });
}

criterion_group!(benches, benchmark_unlock);
criterion_main!(benches);
