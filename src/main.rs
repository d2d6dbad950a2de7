// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geodrop API Server
//!
//! Enforces tier limits and geofenced access for drops, and runs the
//! administrative cascades that clean up after them.

use geodrop::{
    config::{Config, StoreBackend},
    db::{DocumentStore, FirestoreDb, MemoryDb},
    ids::system_rng,
    services::{
        BlobStore, GcsBlobStore, IdentityProvider, IdentityToolkitClient, JwtIdentityProvider,
        MemoryBlobStore,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Geodrop API"
    );

    // Shared by every outbound collaborator call
    let http = reqwest::Client::builder()
        .timeout(config.external_timeout)
        .build()?;

    let (db, blobs): (Arc<dyn DocumentStore>, Arc<dyn BlobStore>) = match config.store_backend {
        StoreBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            let blobs = GcsBlobStore::new(&config.storage_bucket, http.clone());
            tracing::info!(
                bucket = %config.storage_bucket,
                "Firestore and Cloud Storage initialized"
            );
            (Arc::new(db), Arc::new(blobs))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            (Arc::new(MemoryDb::new()), Arc::new(MemoryBlobStore::new()))
        }
    };

    let identity: Arc<dyn IdentityProvider> = Arc::new(
        JwtIdentityProvider::new(&config.jwt_signing_key)
            .with_accounts(IdentityToolkitClient::new(&config.gcp_project_id, http)),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        blobs,
        identity,
        rng: system_rng(),
    });

    // Build router
    let app = geodrop::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("geodrop=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
