// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava connection routes: authorize, callback, disconnect.
//!
//! All of these run behind the session middleware. The OAuth `state`
//! parameter binds the authorization to the session user so a callback can
//! not attach someone else's Strava account.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Maximum age of an OAuth state parameter (10 minutes).
const STATE_MAX_AGE_SECS: i64 = 10 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/strava/auth", get(auth_start))
        .route("/strava/callback", get(auth_callback))
        .route("/strava/disconnect", post(disconnect))
}

/// Start OAuth flow - redirect to Strava authorization.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Redirect> {
    let oauth_state = sign_state(
        user.id,
        chrono::Utc::now().timestamp(),
        &state.config.jwt_signing_key,
    )?;

    tracing::info!(user_id = user.id, "Starting OAuth flow, redirecting to Strava");

    Ok(Redirect::temporary(
        &state.tokens.client().authorize_url(&oauth_state),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens and link the athlete.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let frontend_url = &state.config.frontend_url;

    // Check for OAuth errors (e.g. the athlete declined)
    if let Some(error) = params.error {
        tracing::warn!(user_id = user.id, error = %error, "OAuth error from Strava");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok(Redirect::to(&redirect));
    }

    let signed_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing OAuth state".to_string()))?;
    verify_state(
        &signed_state,
        user.id,
        chrono::Utc::now().timestamp(),
        &state.config.jwt_signing_key,
    )?;

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    tracing::info!(user_id = user.id, "Exchanging authorization code for tokens");

    state.tokens.complete_connection(user.id, &code).await?;

    Ok(Redirect::to(frontend_url))
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub connected: bool,
    pub was_connected: bool,
}

/// Clear the Strava connection. Safe to call repeatedly.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<DisconnectResponse>> {
    let was_connected = state.tokens.disconnect(user.id).await?;

    Ok(Json(DisconnectResponse {
        connected: false,
        was_connected,
    }))
}

/// Build the state parameter: base64("user_id|timestamp_hex|signature_hex").
fn sign_state(user_id: i64, now: i64, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", user_id, now);
    let signature = hex::encode(state_mac(&payload, secret)?);
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

fn state_mac(payload: &str, secret: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check the signature, owner and age of a state parameter.
fn verify_state(state: &str, user_id: i64, now: i64, secret: &[u8]) -> Result<()> {
    let invalid = |reason: &str| {
        tracing::warn!(user_id, reason, "Rejected OAuth state");
        AppError::BadRequest("Invalid OAuth state".to_string())
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|_| invalid("not base64"))?;
    let state_str = String::from_utf8(bytes).map_err(|_| invalid("not utf-8"))?;

    // Format is "user_id|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [owner, timestamp_hex, signature_hex] = parts.as_slice() else {
        return Err(invalid("malformed"));
    };

    let signature = hex::decode(signature_hex).map_err(|_| invalid("bad signature encoding"))?;
    let expected = state_mac(&format!("{}|{}", owner, timestamp_hex), secret)?;
    if !bool::from(signature.as_slice().ct_eq(expected.as_slice())) {
        return Err(invalid("signature mismatch"));
    }

    if owner.parse::<i64>().ok() != Some(user_id) {
        return Err(invalid("issued for another user"));
    }

    let issued_at = i64::from_str_radix(timestamp_hex, 16).map_err(|_| invalid("bad timestamp"))?;
    if now - issued_at > STATE_MAX_AGE_SECS || issued_at > now + 60 {
        return Err(invalid("expired"));
    }

    Ok(())
}
