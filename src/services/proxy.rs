// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-through access to Strava on behalf of a local user.
//!
//! Every call first obtains a token from [`TokenManager`]. A missing token is
//! reported as [`ProxyOutcome::NotConnected`], not as an error, and upstream
//! failures become [`ProxyOutcome::Failed`] so routes can always answer with
//! `{connected, error?, <data>?}`.

use crate::db::Database;
use crate::error::StravaError;
use crate::models::NormalizedActivity;
use crate::services::strava::{ActivityQuery, RemoteActivity, StravaAthlete};
use crate::services::sync::{self, SyncPolicy};
use crate::services::tokens::TokenManager;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

const NOT_CONNECTED_MESSAGE: &str = "Not connected to Strava or token invalid.";

/// Result of a proxied read.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyOutcome<T> {
    Connected(T),
    NotConnected,
    Failed(StravaError),
}

impl<T: Serialize> ProxyOutcome<T> {
    pub fn is_connected(&self) -> bool {
        matches!(self, ProxyOutcome::Connected(_))
    }

    /// Render as the JSON body returned to clients, with the payload under
    /// `key` (`profile`, `stats` or `activities`).
    pub fn into_body(self, key: &str) -> Value {
        match self {
            ProxyOutcome::Connected(data) => {
                let data = serde_json::to_value(data).unwrap_or(Value::Null);
                let mut body = serde_json::Map::new();
                body.insert("connected".to_string(), Value::Bool(true));
                body.insert(key.to_string(), data);
                Value::Object(body)
            }
            ProxyOutcome::NotConnected => json!({
                "connected": false,
                "error": NOT_CONNECTED_MESSAGE,
            }),
            ProxyOutcome::Failed(err @ StravaError::Persistence(_)) => json!({
                "connected": false,
                "error": err.to_string(),
            }),
            ProxyOutcome::Failed(err) => json!({
                "connected": false,
                "error": format!("Failed to fetch Strava {}: {}", key, err),
            }),
        }
    }
}

impl<T> From<Result<T, StravaError>> for ProxyOutcome<T> {
    fn from(result: Result<T, StravaError>) -> Self {
        match result {
            Ok(data) => ProxyOutcome::Connected(data),
            Err(StravaError::NotConnected | StravaError::TokenExpiredNoRefresh) => {
                ProxyOutcome::NotConnected
            }
            Err(e) => ProxyOutcome::Failed(e),
        }
    }
}

/// Profile, stats and recent activities for a user.
#[derive(Clone)]
pub struct ProxyService {
    tokens: TokenManager,
    db: Database,
    sync_policy: SyncPolicy,
}

impl ProxyService {
    pub fn new(tokens: TokenManager, db: Database, sync_policy: SyncPolicy) -> Self {
        Self {
            tokens,
            db,
            sync_policy,
        }
    }

    /// Authenticated athlete profile.
    pub async fn get_profile(&self, user_id: i64) -> ProxyOutcome<StravaAthlete> {
        let Some(token) = self.tokens.get_valid_token(user_id).await else {
            return ProxyOutcome::NotConnected;
        };

        let result = self.tokens.client().get_athlete(&token).await;
        log_failure(user_id, "profile", &result);
        result.into()
    }

    /// Athlete stats. Resolves the athlete ID from the profile first; the
    /// profile itself is not returned.
    pub async fn get_stats(&self, user_id: i64) -> ProxyOutcome<Value> {
        let Some(token) = self.tokens.get_valid_token(user_id).await else {
            return ProxyOutcome::NotConnected;
        };

        let client = self.tokens.client();
        let result = match client.get_athlete(&token).await {
            Ok(athlete) => client.get_athlete_stats(&token, athlete.id).await,
            Err(e) => Err(e),
        };
        log_failure(user_id, "stats", &result);
        result.into()
    }

    /// Fetch a page of activities and sync it into the local store.
    ///
    /// The write happens in one transaction; if it fails nothing is stored
    /// and the outcome is a persistence failure.
    pub async fn get_recent_activities(
        &self,
        user_id: i64,
        query: &ActivityQuery,
    ) -> ProxyOutcome<Vec<NormalizedActivity>> {
        let Some(token) = self.tokens.get_valid_token(user_id).await else {
            return ProxyOutcome::NotConnected;
        };

        let result = match self.tokens.client().list_activities(&token, query).await {
            Ok(batch) => self.sync_batch(user_id, &batch).await,
            Err(e) => Err(e),
        };
        log_failure(user_id, "activities", &result);
        result.into()
    }

    async fn sync_batch(
        &self,
        user_id: i64,
        batch: &[RemoteActivity],
    ) -> Result<Vec<NormalizedActivity>, StravaError> {
        let persistence = |e: sqlx::Error| StravaError::Persistence(e.to_string());

        let mut tx = self.db.begin().await.map_err(persistence)?;
        match sync::sync(&mut tx, user_id, batch, self.sync_policy, Utc::now()).await {
            Ok(normalized) => {
                tx.commit().await.map_err(persistence)?;
                Ok(normalized)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(user_id, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

fn log_failure<T>(user_id: i64, what: &str, result: &Result<T, StravaError>) {
    if let Err(e) = result {
        tracing::warn!(user_id, what, error = %e, "Strava proxy request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_body() {
        let body = ProxyOutcome::Connected(json!({"id": 1})).into_body("profile");
        assert_eq!(body, json!({"connected": true, "profile": {"id": 1}}));
    }

    #[test]
    fn test_not_connected_body() {
        let body = ProxyOutcome::<Value>::NotConnected.into_body("stats");
        assert_eq!(body["connected"], false);
        assert_eq!(body["error"], NOT_CONNECTED_MESSAGE);
        assert!(body.get("stats").is_none());
    }

    #[test]
    fn test_failed_body_names_the_call() {
        let body = ProxyOutcome::<Value>::Failed(StravaError::Upstream(
            "Athlete stats: HTTP 500 Internal Server Error: boom".to_string(),
        ))
        .into_body("stats");

        assert_eq!(body["connected"], false);
        assert_eq!(
            body["error"],
            "Failed to fetch Strava stats: Athlete stats: HTTP 500 Internal Server Error: boom"
        );
    }

    #[test]
    fn test_persistence_failure_body() {
        let body = ProxyOutcome::<Value>::Failed(StravaError::Persistence("disk full".to_string()))
            .into_body("activities");
        assert_eq!(body["error"], "Database error: disk full");
    }

    #[test]
    fn test_not_connected_errors_map_to_not_connected() {
        let outcome: ProxyOutcome<Value> = Err(StravaError::TokenExpiredNoRefresh).into();
        assert_eq!(outcome, ProxyOutcome::NotConnected);
        assert!(!outcome.is_connected());
    }
}
