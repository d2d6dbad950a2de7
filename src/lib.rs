// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Geodrop: access control and tier enforcement for geo-anchored drops.
//!
//! This crate provides the backend API that decides who may create, unlock,
//! join, and delete drops, and how far each subscription tier may go.

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use ring::rand::SystemRandom;
use services::{BlobStore, IdentityProvider};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub rng: SystemRandom,
}
