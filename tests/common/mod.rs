// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use std::sync::Arc;
use stravalink::config::Config;
use stravalink::db::Database;
use stravalink::middleware::auth::{create_jwt, SESSION_COOKIE};
use stravalink::models::{NewUser, User};
use stravalink::routes::create_router;
use stravalink::AppState;
use wiremock::MockServer;

/// Password used for every seeded test account.
#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Router and state wired to an in-memory database, with Strava pointed at
/// a local mock server.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub strava: MockServer,
}

/// Create a test app with default test configuration.
#[allow(dead_code)]
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Create a test app, adjusting the configuration first.
#[allow(dead_code)]
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let strava = MockServer::start().await;

    let mut config = Config::test_default().with_strava_base(&strava.uri());
    configure(&mut config);

    let db = Database::in_memory().await.expect("in-memory database");
    let state = Arc::new(AppState::new(config, db).expect("app state"));

    TestApp {
        router: create_router(state.clone()),
        state,
        strava,
    }
}

/// Insert a local account.
#[allow(dead_code)]
pub async fn create_user(db: &Database, username: &str) -> User {
    let password_hash = bcrypt::hash(TEST_PASSWORD, 4).expect("bcrypt hash");
    db.create_user(&NewUser {
        username: username.to_string(),
        email: Some(format!("{}@example.com", username)),
        password_hash,
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
    })
    .await
    .expect("create user")
}

/// Write token columns directly, including states the services never
/// produce themselves (e.g. a missing refresh token).
#[allow(dead_code)]
pub async fn store_tokens(
    db: &Database,
    user_id: i64,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: Option<i64>,
) {
    sqlx::query(
        r"
        UPDATE users SET
            strava_access_token = ?,
            strava_refresh_token = ?,
            strava_token_expires_at = ?,
            strava_connected_at = ?
        WHERE id = ?
        ",
    )
    .bind(access_token)
    .bind(refresh_token)
    .bind(expires_at)
    .bind(chrono::Utc::now())
    .bind(user_id)
    .execute(db.pool())
    .await
    .expect("store tokens");
}

/// Current Unix time in seconds.
#[allow(dead_code)]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// `Cookie` header value carrying a session for `user_id`.
#[allow(dead_code)]
pub fn session_cookie(state: &AppState, user_id: i64) -> String {
    let jwt = create_jwt(user_id, &state.config.jwt_signing_key).expect("create jwt");
    format!("{}={}", SESSION_COOKIE, jwt)
}

/// Token endpoint success body.
#[allow(dead_code)]
pub fn token_body(access: &str, refresh: &str, expires_at: i64) -> serde_json::Value {
    serde_json::json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_at": expires_at,
        "expires_in": 21600
    })
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
