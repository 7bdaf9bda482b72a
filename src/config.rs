// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to the services that need
//! it; nothing below reads the environment on its own.

use std::env;
use std::time::Duration;

use crate::services::sync::SyncPolicy;

const DEFAULT_OAUTH_BASE_URL: &str = "https://www.strava.com/oauth";
const DEFAULT_API_BASE_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Strava OAuth application settings and endpoints.
#[derive(Debug, Clone)]
pub struct StravaSettings {
    /// OAuth client ID (public)
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Callback URL registered with Strava
    pub redirect_uri: String,
    /// Base for `/authorize`, `/token` and `/deauthorize`
    pub oauth_base_url: String,
    /// Base for athlete and activity endpoints
    pub api_base_url: String,
    /// Upper bound for every outbound request
    pub request_timeout: Duration,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub strava: StravaSettings,
    /// SQLite connection string
    pub database_url: String,
    /// Where the browser lands after login or Strava connection
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// HMAC key for session JWTs and OAuth state (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// How activity batches are reconciled with stored records
    pub sync_policy: SyncPolicy,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let request_timeout = match env::var("STRAVA_HTTP_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("STRAVA_HTTP_TIMEOUT_SECS", raw.clone()))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let sync_policy = match env::var("SYNC_POLICY") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("SYNC_POLICY", raw.clone()))?,
            Err(_) => SyncPolicy::default(),
        };

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("BCRYPT_COST", raw.clone()))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            strava: StravaSettings {
                client_id: required("STRAVA_CLIENT_ID")?,
                client_secret: required("STRAVA_CLIENT_SECRET")?,
                redirect_uri: required("STRAVA_REDIRECT_URI")?,
                oauth_base_url: env::var("STRAVA_OAUTH_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_OAUTH_BASE_URL.to_string()),
                api_base_url: env::var("STRAVA_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
                request_timeout,
            },
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "/".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
            sync_policy,
            bcrypt_cost,
        })
    }

    /// Offline configuration for tests.
    pub fn test_default() -> Self {
        Self {
            strava: StravaSettings {
                client_id: "test_client_id".to_string(),
                client_secret: "test_secret".to_string(),
                redirect_uri: "http://localhost:8080/strava/callback".to_string(),
                oauth_base_url: "http://127.0.0.1:9/oauth".to_string(),
                api_base_url: "http://127.0.0.1:9/api/v3".to_string(),
                request_timeout: Duration::from_secs(2),
            },
            database_url: "sqlite::memory:".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            sync_policy: SyncPolicy::default(),
            bcrypt_cost: 4,
        }
    }

    /// Point both Strava bases at a single test server root.
    pub fn with_strava_base(mut self, base: &str) -> Self {
        self.strava.oauth_base_url = format!("{}/oauth", base);
        self.strava.api_base_url = format!("{}/api/v3", base);
        self
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
