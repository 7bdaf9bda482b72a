// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava token lifecycle: connect, validate, refresh, disconnect.

use crate::db::{tokens, Database};
use crate::error::StravaError;
use crate::models::{TokenRecord, TokenSet};
use crate::services::strava::{StravaAthlete, StravaClient};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Shared refresh locks type, one mutex per local user.
pub type RefreshLocks = Arc<DashMap<i64, Arc<Mutex<()>>>>;

fn persistence(e: sqlx::Error) -> StravaError {
    StravaError::Persistence(e.to_string())
}

/// Owns the token lifecycle for all users.
///
/// This service encapsulates:
/// - Code exchange and persistence on first connection
/// - Returning the stored token while it is outside the refresh margin
/// - Refreshing and persisting when it is not
/// - Per-user locking to prevent duplicate refresh calls
/// - Clearing and deauthorizing on disconnect
#[derive(Clone)]
pub struct TokenManager {
    client: StravaClient,
    db: Database,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl TokenManager {
    pub fn new(client: StravaClient, db: Database) -> Self {
        Self {
            client,
            db,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    /// Get a usable access token, or `None` if there is none to be had.
    ///
    /// Failures are logged, never returned; use [`Self::try_get_valid_token`]
    /// for the reason.
    pub async fn get_valid_token(&self, user_id: i64) -> Option<String> {
        match self.try_get_valid_token(user_id).await {
            Ok(token) => Some(token),
            Err(StravaError::NotConnected) => None,
            Err(StravaError::TokenExpiredNoRefresh) => {
                tracing::info!(user_id, "Strava token expired and no refresh token stored");
                None
            }
            Err(e) if e.needs_reconnect() => {
                tracing::info!(user_id, error = %e, "Strava connection needs to be re-established");
                None
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Could not obtain valid Strava token");
                None
            }
        }
    }

    /// Get a usable access token for `user_id`.
    ///
    /// 1. Load the stored record; none → `NotConnected`
    /// 2. Expiry more than the margin away → stored token, no network
    /// 3. No refresh token → `TokenExpiredNoRefresh`, no network
    /// 4. Take the per-user lock and re-read (another task may have refreshed)
    /// 5. Refresh with Strava; persist only if the refresh token used is
    ///    still the stored one (a disconnect may have cleared it)
    /// 6. On `invalid_grant`, re-read: another writer already refreshed
    pub async fn try_get_valid_token(&self, user_id: i64) -> Result<String, StravaError> {
        let record = self.load(user_id).await?.ok_or(StravaError::NotConnected)?;
        if record.is_fresh(Utc::now().timestamp(), TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(record.access_token);
        }
        if record.refresh_token.is_none() {
            return Err(StravaError::TokenExpiredNoRefresh);
        }

        let lock = self.refresh_lock(user_id);
        let _guard = lock.lock().await;

        // Double-check after acquiring the lock.
        let record = self.load(user_id).await?.ok_or(StravaError::NotConnected)?;
        if record.is_fresh(Utc::now().timestamp(), TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(record.access_token);
        }
        let refresh_token = record
            .refresh_token
            .ok_or(StravaError::TokenExpiredNoRefresh)?;

        tracing::info!(user_id, "Access token expiring, refreshing");

        let grant = match self.client.refresh_token(&refresh_token).await {
            Ok(grant) => grant,
            Err(e) if e.is_invalid_grant() => {
                tracing::info!(
                    user_id,
                    "Refresh token already used - re-reading stored tokens"
                );
                return match self.load(user_id).await? {
                    Some(current)
                        if current.is_fresh(Utc::now().timestamp(), TOKEN_REFRESH_MARGIN_SECS) =>
                    {
                        Ok(current.access_token)
                    }
                    _ => Err(e),
                };
            }
            Err(e) => return Err(e),
        };

        let mut tx = self.db.begin().await.map_err(persistence)?;
        tokens::persist_refreshed(&mut tx, user_id, &refresh_token, &grant.tokens, Utc::now())
            .await?;
        tx.commit().await.map_err(persistence)?;

        tracing::info!(user_id, expires_at = grant.tokens.expires_at, "Token refreshed");
        Ok(grant.tokens.access_token)
    }

    /// Exchange an authorization code and store the resulting tokens and
    /// athlete link for `user_id`.
    pub async fn complete_connection(
        &self,
        user_id: i64,
        code: &str,
    ) -> Result<Option<StravaAthlete>, StravaError> {
        let grant = self.client.exchange_code(code).await?;

        self.store(user_id, &grant.tokens, grant.athlete.as_ref())
            .await?;

        tracing::info!(
            user_id,
            athlete_id = grant.athlete.as_ref().map(|a| a.id),
            "Strava connected"
        );
        Ok(grant.athlete)
    }

    /// Forget a user's Strava connection.
    ///
    /// Waits for any refresh in progress for the user, then clears and
    /// commits the local tokens; deauthorizing at Strava is best effort.
    /// Returns whether anything was connected.
    pub async fn disconnect(&self, user_id: i64) -> Result<bool, StravaError> {
        let lock = self.refresh_lock(user_id);
        let guard = lock.lock().await;

        let mut tx = self.db.begin().await.map_err(persistence)?;
        let previous = tokens::clear(&mut tx, user_id, Utc::now()).await?;
        tx.commit().await.map_err(persistence)?;
        drop(guard);

        let Some(access_token) = previous else {
            return Ok(false);
        };

        if let Err(e) = self.client.deauthorize(&access_token).await {
            tracing::warn!(user_id, error = %e, "Strava deauthorization failed");
        }

        tracing::info!(user_id, "Strava disconnected");
        Ok(true)
    }

    fn refresh_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, user_id: i64) -> Result<Option<TokenRecord>, StravaError> {
        let mut conn = self.db.pool().acquire().await.map_err(persistence)?;
        tokens::load(&mut conn, user_id).await
    }

    /// Write a freshly exchanged token set in its own transaction.
    async fn store(
        &self,
        user_id: i64,
        token_set: &TokenSet,
        athlete: Option<&StravaAthlete>,
    ) -> Result<(), StravaError> {
        let mut tx = self.db.begin().await.map_err(persistence)?;
        tokens::persist(&mut tx, user_id, token_set, athlete.map(|a| a.id), Utc::now()).await?;
        tx.commit().await.map_err(persistence)
    }
}
