// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User and OAuth token models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Local account stored in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    /// bcrypt hash, never sent to clients
    #[serde(skip_serializing, default)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Linked Strava athlete, set on first successful code exchange
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub strava_athlete_id: Option<u64>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Strava token state as stored on the user row.
///
/// Writes always go through [`TokenSet`], so all three token fields change
/// together. Reads tolerate rows written before that was enforced: a missing
/// expiry counts as expired and a missing refresh token means the user has to
/// reconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expires_at: Option<i64>,
    pub connected_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Whether the access token outlives `now + margin_secs`.
    pub fn is_fresh(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at > now.saturating_add(margin_secs))
    }
}

/// Access token, refresh token and expiry as returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: Option<i64>) -> TokenRecord {
        TokenRecord {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at,
            connected_at: None,
        }
    }

    #[test]
    fn test_is_fresh_outside_margin() {
        assert!(record(Some(1_000 + 301)).is_fresh(1_000, 300));
    }

    #[test]
    fn test_is_fresh_at_margin_boundary() {
        // Exactly now + margin counts as expiring.
        assert!(!record(Some(1_000 + 300)).is_fresh(1_000, 300));
    }

    #[test]
    fn test_missing_expiry_is_not_fresh() {
        assert!(!record(None).is_fresh(1_000, 300));
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: "alice".to_string(),
            email: None,
            password_hash: "$2b$04$secret".to_string(),
            first_name: None,
            last_name: None,
            strava_athlete_id: Some(42),
            created_at: now,
            updated_at: now,
            last_login: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["strava_athlete_id"], 42);
    }
}
