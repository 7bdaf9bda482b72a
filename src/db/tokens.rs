// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token store: Strava OAuth tokens kept on the user row.
//!
//! Every function takes the caller's connection (usually a transaction) so
//! a failed write can be rolled back together with whatever else the caller
//! did. Access token, refresh token and expiry are always written by one
//! statement.

use crate::error::StravaError;
use crate::models::{TokenRecord, TokenSet};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

fn persistence(e: sqlx::Error) -> StravaError {
    StravaError::Persistence(e.to_string())
}

/// Load the stored token state for a user.
///
/// Returns `None` when the user does not exist or has no access token.
pub async fn load(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<TokenRecord>, StravaError> {
    let row = sqlx::query(
        r"
        SELECT strava_access_token, strava_refresh_token,
               strava_token_expires_at, strava_connected_at
        FROM users WHERE id = ?
        ",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(persistence)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let access_token: Option<String> = row.try_get("strava_access_token").map_err(persistence)?;
    let Some(access_token) = access_token.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    Ok(Some(TokenRecord {
        access_token,
        refresh_token: row
            .try_get::<Option<String>, _>("strava_refresh_token")
            .map_err(persistence)?
            .filter(|t| !t.is_empty()),
        expires_at: row.try_get("strava_token_expires_at").map_err(persistence)?,
        connected_at: row.try_get("strava_connected_at").map_err(persistence)?,
    }))
}

/// Overwrite a user's token state.
///
/// `connected_at` is only set the first time; `athlete_id` links the Strava
/// athlete when known and leaves an existing link alone otherwise.
pub async fn persist(
    conn: &mut SqliteConnection,
    user_id: i64,
    tokens: &TokenSet,
    athlete_id: Option<u64>,
    now: DateTime<Utc>,
) -> Result<(), StravaError> {
    let result = sqlx::query(
        r"
        UPDATE users SET
            strava_access_token = ?,
            strava_refresh_token = ?,
            strava_token_expires_at = ?,
            strava_connected_at = COALESCE(strava_connected_at, ?),
            strava_athlete_id = COALESCE(?, strava_athlete_id),
            updated_at = ?
        WHERE id = ?
        ",
    )
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(tokens.expires_at)
    .bind(now)
    .bind(athlete_id.map(|id| id as i64))
    .bind(now)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StravaError::AthleteAlreadyLinked
        }
        e => persistence(e),
    })?;

    if result.rows_affected() == 0 {
        return Err(StravaError::Persistence(format!(
            "User {} not found",
            user_id
        )));
    }

    Ok(())
}

/// Store the result of a refresh, but only if `used_refresh_token` is still
/// the stored refresh token.
///
/// A disconnect or another writer may have replaced the tokens while the
/// refresh was in flight; in that case nothing is written and the result is
/// `NotConnected`.
pub async fn persist_refreshed(
    conn: &mut SqliteConnection,
    user_id: i64,
    used_refresh_token: &str,
    tokens: &TokenSet,
    now: DateTime<Utc>,
) -> Result<(), StravaError> {
    let result = sqlx::query(
        r"
        UPDATE users SET
            strava_access_token = ?,
            strava_refresh_token = ?,
            strava_token_expires_at = ?,
            updated_at = ?
        WHERE id = ? AND strava_refresh_token = ?
        ",
    )
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(tokens.expires_at)
    .bind(now)
    .bind(user_id)
    .bind(used_refresh_token)
    .execute(&mut *conn)
    .await
    .map_err(persistence)?;

    if result.rows_affected() == 0 {
        return Err(StravaError::NotConnected);
    }

    Ok(())
}

/// Remove all token state and the athlete link.
///
/// Returns the access token that was stored, if any, so the caller can
/// deauthorize it remotely.
pub async fn clear(
    conn: &mut SqliteConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<String>, StravaError> {
    let previous = load(&mut *conn, user_id).await?;

    sqlx::query(
        r"
        UPDATE users SET
            strava_access_token = NULL,
            strava_refresh_token = NULL,
            strava_token_expires_at = NULL,
            strava_connected_at = NULL,
            strava_athlete_id = NULL,
            updated_at = ?
        WHERE id = ?
        ",
    )
    .bind(now)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(persistence)?;

    Ok(previous.map(|record| record.access_token))
}
