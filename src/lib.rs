// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stravalink: local accounts linked to Strava
//!
//! This crate provides the backend API for connecting a local account to
//! Strava, keeping its OAuth tokens valid, and syncing recent activities
//! into a local store.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Database;
use error::AppError;
use services::{ProxyService, StravaClient, TokenManager};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub tokens: TokenManager,
    pub proxy: ProxyService,
}

impl AppState {
    /// Wire up services from configuration and an open database.
    pub fn new(config: Config, db: Database) -> Result<Self, AppError> {
        let client = StravaClient::new(&config.strava)?;
        let tokens = TokenManager::new(client, db.clone());
        let proxy = ProxyService::new(tokens.clone(), db.clone(), config.sync_policy);

        Ok(Self {
            config,
            db,
            tokens,
            proxy,
        })
    }
}
