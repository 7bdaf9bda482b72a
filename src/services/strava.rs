// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Authorization code exchange and token refresh (OAuth token endpoint)
//! - Athlete profile, stats and activity listing
//! - Deauthorization on disconnect
//!
//! The client holds only immutable credentials and a pooled HTTP client, so
//! it is cheap to clone and safe to share between requests. It never
//! persists anything; callers store the returned tokens.

use crate::config::StravaSettings;
use crate::error::{AppError, StravaError};
use crate::models::TokenSet;
use serde::{Deserialize, Serialize};

/// OAuth scopes requested at authorization time.
pub const OAUTH_SCOPES: &str = "read,activity:read_all,profile:read_all";

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    oauth_base_url: String,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    ///
    /// Every request is bounded by `settings.request_timeout`.
    pub fn new(settings: &StravaSettings) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            oauth_base_url: settings.oauth_base_url.trim_end_matches('/').to_string(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
        })
    }

    /// Authorization URL the browser is sent to when connecting Strava.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&response_type=code&approval_prompt=auto&scope={}&state={}",
            self.oauth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state),
        )
    }

    // ─── OAuth Token Endpoint ────────────────────────────────────────────────

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, StravaError> {
        self.request_tokens(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, StravaError> {
        self.request_tokens(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// POST to the token endpoint with the client credentials plus the
    /// grant-specific fields.
    async fn request_tokens(&self, grant: &[(&str, &str)]) -> Result<TokenGrant, StravaError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(format!("{}/token", self.oauth_base_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| request_error("Token request", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Strava token endpoint rejected request");
            return Err(StravaError::OAuthExchange {
                status: status.as_u16(),
                body,
            });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| StravaError::Upstream(format!("Failed to parse token response: {}", e)))?;

        token_response.into_grant(chrono::Utc::now().timestamp())
    }

    /// Deauthorize the application for a user.
    ///
    /// This invalidates all access and refresh tokens for the user
    /// and removes the app from their Strava settings.
    pub async fn deauthorize(&self, access_token: &str) -> Result<(), StravaError> {
        let response = self
            .http
            .post(format!("{}/deauthorize", self.oauth_base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| request_error("Deauthorization request", &e))?;

        check_response(response, "Deauthorization").await?;
        tracing::info!("Strava deauthorization successful");
        Ok(())
    }

    // ─── Athlete API ─────────────────────────────────────────────────────────

    /// Get authenticated athlete profile.
    pub async fn get_athlete(&self, access_token: &str) -> Result<StravaAthlete, StravaError> {
        let url = format!("{}/athlete", self.api_base_url);
        self.get_json(&url, access_token, &[], "Athlete profile")
            .await
    }

    /// Get aggregate stats for an athlete.
    pub async fn get_athlete_stats(
        &self,
        access_token: &str,
        athlete_id: u64,
    ) -> Result<serde_json::Value, StravaError> {
        let url = format!("{}/athletes/{}/stats", self.api_base_url, athlete_id);
        self.get_json(&url, access_token, &[], "Athlete stats").await
    }

    /// List the athlete's activities (paginated, newest first).
    pub async fn list_activities(
        &self,
        access_token: &str,
        query: &ActivityQuery,
    ) -> Result<Vec<RemoteActivity>, StravaError> {
        let url = format!("{}/athlete/activities", self.api_base_url);

        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(after) = query.after {
            params.push(("after", after.to_string()));
        }
        if let Some(before) = query.before {
            params.push(("before", before.to_string()));
        }

        self.get_json(&url, access_token, &params, "Activity list")
            .await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<T, StravaError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(params)
            .send()
            .await
            .map_err(|e| request_error(what, &e))?;

        let response = check_response(response, what).await?;

        response
            .json()
            .await
            .map_err(|e| StravaError::Upstream(format!("{}: JSON parse error: {}", what, e)))
    }
}

fn request_error(what: &str, e: &reqwest::Error) -> StravaError {
    if e.is_timeout() {
        StravaError::Upstream(format!("{} timed out", what))
    } else {
        StravaError::Upstream(format!("{} failed: {}", what, e))
    }
}

/// Check response status and return error if not successful.
async fn check_response(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, StravaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("Strava rate limit hit (429)");
        return Err(StravaError::Upstream(format!(
            "{}: rate limit exceeded",
            what
        )));
    }

    // Unauthorized - token may be expired or revoked
    if status.as_u16() == 401 {
        return Err(StravaError::Upstream(format!(
            "{}: unauthorized (token expired or revoked)",
            what
        )));
    }

    Err(StravaError::Upstream(format!(
        "{}: HTTP {}: {}",
        what, status, body
    )))
}

/// Token endpoint response. Strava sends `expires_at`; `expires_in` is
/// accepted as a fallback.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    athlete: Option<StravaAthlete>,
}

impl TokenResponse {
    fn into_grant(self, now: i64) -> Result<TokenGrant, StravaError> {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => at,
            (None, Some(secs)) => now.saturating_add(secs),
            (None, None) => {
                return Err(StravaError::Upstream(
                    "Token response has neither expires_at nor expires_in".to_string(),
                ))
            }
        };

        Ok(TokenGrant {
            tokens: TokenSet {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
            athlete: self.athlete,
        })
    }
}

/// Parsed token endpoint result.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub tokens: TokenSet,
    /// Only present on the authorization code exchange.
    pub athlete: Option<StravaAthlete>,
}

/// Athlete profile. Only the ID is interpreted; everything else is passed
/// through to clients unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Summary activity from the list endpoint.
///
/// Everything but the ID is optional; missing numbers count as zero when
/// normalized.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RemoteActivity {
    pub id: u64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub sport_type: Option<String>,
    pub start_date: Option<String>,
    /// Meters
    pub distance: Option<f64>,
    /// Seconds
    pub moving_time: Option<i64>,
    /// Meters per second
    pub average_speed: Option<f64>,
}

/// Paging and time window for the activity list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityQuery {
    pub page: u32,
    pub per_page: u32,
    /// Only activities after this Unix timestamp
    pub after: Option<i64>,
    /// Only activities before this Unix timestamp
    pub before: Option<i64>,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 5,
            after: None,
            before: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> StravaClient {
        StravaClient::new(&StravaSettings {
            client_id: "123".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8080/strava/callback".to_string(),
            oauth_base_url: "https://www.strava.com/oauth/".to_string(),
            api_base_url: "https://www.strava.com/api/v3".to_string(),
            request_timeout: Duration::from_secs(10),
        })
        .unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let url = client().authorize_url("abc");
        assert!(url.starts_with("https://www.strava.com/oauth/authorize?client_id=123&"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fstrava%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=read%2Cactivity%3Aread_all%2Cprofile%3Aread_all"));
        assert!(url.ends_with("&state=abc"));
    }

    #[test]
    fn test_token_response_prefers_expires_at() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_at": 2_000,
            "expires_in": 21_600
        }))
        .unwrap();

        let grant = response.into_grant(1_000).unwrap();
        assert_eq!(grant.tokens.expires_at, 2_000);
        assert!(grant.athlete.is_none());
    }

    #[test]
    fn test_token_response_falls_back_to_expires_in() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 21_600,
            "athlete": {"id": 42, "firstname": "Ada"}
        }))
        .unwrap();

        let grant = response.into_grant(1_000).unwrap();
        assert_eq!(grant.tokens.expires_at, 22_600);
        let athlete = grant.athlete.unwrap();
        assert_eq!(athlete.id, 42);
        assert_eq!(athlete.details["firstname"], "Ada");
    }

    #[test]
    fn test_token_response_without_expiry_is_rejected() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r"
        }))
        .unwrap();

        assert!(response.into_grant(1_000).unwrap_err().is_upstream());
    }

    #[test]
    fn test_remote_activity_tolerates_missing_fields() {
        let activity: RemoteActivity =
            serde_json::from_value(serde_json::json!({"id": 7, "type": "Run"})).unwrap();

        assert_eq!(activity.id, 7);
        assert_eq!(activity.activity_type.as_deref(), Some("Run"));
        assert_eq!(activity.distance, None);
        assert_eq!(activity.moving_time, None);
    }
}
