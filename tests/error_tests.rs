// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use stravalink::error::{AppError, StravaError};

fn status_of(err: StravaError) -> StatusCode {
    AppError::from(err).into_response().status()
}

#[test]
fn test_strava_error_status_mapping() {
    assert_eq!(status_of(StravaError::NotConnected), StatusCode::BAD_REQUEST);
    assert_eq!(
        status_of(StravaError::TokenExpiredNoRefresh),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(StravaError::OAuthExchange {
            status: 400,
            body: "bad".to_string()
        }),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(StravaError::Upstream("Athlete profile timed out".to_string())),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status_of(StravaError::AthleteAlreadyLinked),
        StatusCode::CONFLICT
    );
    assert_eq!(
        status_of(StravaError::Persistence("locked".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_needs_reconnect() {
    assert!(StravaError::NotConnected.needs_reconnect());
    assert!(StravaError::TokenExpiredNoRefresh.needs_reconnect());
    assert!(StravaError::OAuthExchange {
        status: 401,
        body: String::new()
    }
    .needs_reconnect());
    assert!(StravaError::OAuthExchange {
        status: 400,
        body: r#"{"error":"invalid_grant"}"#.to_string()
    }
    .needs_reconnect());

    assert!(!StravaError::Upstream("HTTP 500".to_string()).needs_reconnect());
    assert!(!StravaError::OAuthExchange {
        status: 503,
        body: String::new()
    }
    .needs_reconnect());
}

#[test]
fn test_upstream_classification() {
    assert!(StravaError::Upstream("x".to_string()).is_upstream());
    assert!(StravaError::OAuthExchange {
        status: 500,
        body: String::new()
    }
    .is_upstream());
    assert!(!StravaError::NotConnected.is_upstream());
    assert!(!StravaError::Persistence("x".to_string()).is_upstream());
}

#[test]
fn test_error_messages_preserve_upstream_text() {
    let err = StravaError::OAuthExchange {
        status: 401,
        body: "Authorization Error".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "OAuth token exchange failed with HTTP 401: Authorization Error"
    );
    assert_eq!(
        StravaError::Persistence("disk I/O error".to_string()).to_string(),
        "Database error: disk I/O error"
    );
}
