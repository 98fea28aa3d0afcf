// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! VidTube: backend for a video-sharing platform
//!
//! This crate provides the REST API for users, videos, comments, likes,
//! playlists, subscriptions and tweets, with rotating refresh-token
//! sessions and aggregation read models over a document store.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use services::{PasswordHasher, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
}

impl AppState {
    /// Wire services over an opened store.
    pub fn new(
        config: Config,
        store: std::sync::Arc<dyn db::DocumentStore>,
    ) -> Result<Self, error::AppError> {
        let db = Db::new(store);
        let tokens = TokenService::new(db.clone(), &config);
        let passwords = PasswordHasher::from_config(&config)?;

        Ok(Self {
            config,
            db,
            tokens,
            passwords,
        })
    }
}
