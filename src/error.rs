// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::StravaApi(msg) => {
                (StatusCode::BAD_GATEWAY, "strava_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

/// Failures of the Strava integration.
///
/// `NotConnected` and `TokenExpiredNoRefresh` are states rather than faults:
/// the user has to (re)connect before anything can be fetched. The upstream
/// variants are retryable by the caller and never retried here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StravaError {
    #[error("Not connected to Strava")]
    NotConnected,

    #[error("Strava token expired and no refresh token is stored")]
    TokenExpiredNoRefresh,

    /// Token endpoint answered with a non-success status.
    #[error("OAuth token exchange failed with HTTP {status}: {body}")]
    OAuthExchange { status: u16, body: String },

    /// Non-2xx, network failure or timeout on a Strava API call.
    #[error("{0}")]
    Upstream(String),

    /// The Strava athlete is already linked to a different local user.
    #[error("Strava account already linked to another user")]
    AthleteAlreadyLinked,

    /// Local commit failed; the surrounding transaction was rolled back.
    #[error("Database error: {0}")]
    Persistence(String),
}

impl StravaError {
    /// Body fragment Strava returns when a refresh token was already used.
    pub const INVALID_GRANT: &'static str = "invalid_grant";

    /// True for failures caused by the remote service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            StravaError::OAuthExchange { .. } | StravaError::Upstream(_)
        )
    }

    /// True when the user has to go through the OAuth flow again.
    pub fn needs_reconnect(&self) -> bool {
        match self {
            StravaError::NotConnected | StravaError::TokenExpiredNoRefresh => true,
            StravaError::OAuthExchange { status, body } => {
                *status == 401 || body.contains(Self::INVALID_GRANT)
            }
            _ => false,
        }
    }

    /// True if the token endpoint rejected a refresh token that another
    /// writer has already exchanged.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, StravaError::OAuthExchange { body, .. } if body.contains(Self::INVALID_GRANT))
    }
}

impl From<StravaError> for AppError {
    fn from(err: StravaError) -> Self {
        match err {
            StravaError::NotConnected | StravaError::TokenExpiredNoRefresh => {
                AppError::BadRequest(err.to_string())
            }
            StravaError::OAuthExchange { .. } | StravaError::Upstream(_) => {
                AppError::StravaApi(err.to_string())
            }
            StravaError::AthleteAlreadyLinked => AppError::Conflict(err.to_string()),
            StravaError::Persistence(msg) => AppError::Database(msg),
        }
    }
}
