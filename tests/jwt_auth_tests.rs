// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session tests.
//!
//! These tests verify that JWT tokens created at login can be decoded
//! by the auth middleware, catching compatibility issues early.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use stravalink::error::AppError;
use stravalink::middleware::auth::{create_jwt, verify_jwt, SESSION_TTL_SECS};

/// Claims structure that must match what the middleware expects.
/// This is the canonical format - if either create_jwt or the middleware
/// changes, this test should catch the incompatibility.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[test]
fn test_jwt_roundtrip() {
    let token = create_jwt(12345, SIGNING_KEY).unwrap();

    // Decode token independently of the middleware
    let key = DecodingKey::from_secret(SIGNING_KEY);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(&token, &key, &validation)
        .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(token_data.claims.sub, "12345");
    assert!(token_data.claims.exp > token_data.claims.iat);
    assert_eq!(verify_jwt(&token, SIGNING_KEY).unwrap(), 12345);
}

#[test]
fn test_jwt_expires_after_thirty_minutes() {
    let token = create_jwt(1, SIGNING_KEY).unwrap();

    let key = DecodingKey::from_secret(SIGNING_KEY);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false; // We'll check manually

    let claims = decode::<Claims>(&token, &key, &validation).unwrap().claims;

    assert_eq!(SESSION_TTL_SECS, 30 * 60);
    assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECS);
    assert!(claims.exp <= unix_now() + SESSION_TTL_SECS + 1);
}

#[test]
fn test_expired_jwt_rejected() {
    let now = unix_now();
    let claims = Claims {
        sub: "1".to_string(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(matches!(
        verify_jwt(&token, SIGNING_KEY),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_wrong_algorithm_rejected() {
    let now = unix_now();
    let claims = Claims {
        sub: "1".to_string(),
        iat: now,
        exp: now + 600,
    };
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(verify_jwt(&token, SIGNING_KEY).is_err());
}
