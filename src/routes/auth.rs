// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local account routes: signup, login, logout.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    routing::post,
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::NewUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Signup form.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(length(min = 3, max = 64, message = "must be 3-64 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "must be 8-128 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub firstname: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub lastname: Option<String>,
}

impl SignupForm {
    /// HTML forms submit empty strings for untouched optional fields.
    fn normalized(mut self) -> Self {
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        self.username = self.username.trim().to_string();
        self.email = blank_to_none(self.email);
        self.firstname = blank_to_none(self.firstname);
        self.lastname = blank_to_none(self.lastname);
        self
    }
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn validation_error(errors: validator::ValidationErrors) -> AppError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "is invalid".to_string());
            format!("{} {}", field, reason)
        })
        .collect();
    fields.sort();
    AppError::BadRequest(fields.join("; "))
}

/// Create a local account.
async fn signup(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SignupForm>,
) -> Result<Redirect> {
    let form = form.normalized();
    form.validate().map_err(validation_error)?;

    let cost = state.config.bcrypt_cost;
    let password = form.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

    let user = state
        .db
        .create_user(&NewUser {
            username: form.username,
            email: form.email,
            password_hash,
            first_name: form.firstname,
            last_name: form.lastname,
        })
        .await?;

    tracing::info!(user_id = user.id, "Account created");

    Ok(Redirect::to("/"))
}

/// Check credentials and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse> {
    let invalid = || AppError::BadRequest("Incorrect username or password".to_string());

    let user = state
        .db
        .get_user_by_username(form.username.trim())
        .await?
        .ok_or_else(invalid)?;

    let password = form.password;
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
        .unwrap_or(false);

    if !valid {
        tracing::info!(user_id = user.id, "Login rejected");
        return Err(invalid());
    }

    let jwt = create_jwt(user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    state.db.record_login(user.id, chrono::Utc::now()).await?;
    tracing::info!(user_id = user.id, "Login successful");

    let cookie = Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64));

    Ok((
        jar.add(cookie),
        Redirect::to(&state.config.frontend_url),
    ))
}

/// End the session. The expired cookie is always sent, whether or not the
/// request carried one.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let expired = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO);

    (jar.add(expired), Redirect::to("/"))
}
