// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::models::{ActivityRecord, User};
use crate::services::ActivityQuery;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/strava/profile", get(get_strava_profile))
        .route("/api/strava/stats", get(get_strava_stats))
        .route("/api/strava/recent-activities", get(get_recent_activities))
        .route("/api/activities", get(get_activities))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub strava_connected: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub strava_athlete_id: Option<u64>,
}

/// Get current user profile.
async fn get_me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        firstname: user.first_name,
        lastname: user.last_name,
        strava_connected: user.strava_athlete_id.is_some(),
        strava_athlete_id: user.strava_athlete_id,
    })
}

// ─── Strava Proxy ────────────────────────────────────────────

/// Strava athlete profile as `{connected, profile | error}`.
async fn get_strava_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Json<Value> {
    Json(state.proxy.get_profile(user.id).await.into_body("profile"))
}

/// Strava athlete stats as `{connected, stats | error}`.
async fn get_strava_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Json<Value> {
    Json(state.proxy.get_stats(user.id).await.into_body("stats"))
}

#[derive(Debug, Deserialize)]
struct RecentActivitiesQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_recent_per_page")]
    per_page: u32,
    /// Unix timestamp
    after: Option<i64>,
    /// Unix timestamp
    before: Option<i64>,
}

fn default_page() -> u32 {
    1
}
fn default_recent_per_page() -> u32 {
    5
}
fn default_per_page() -> u32 {
    50
}

/// Strava's upper bound for `per_page`.
const MAX_STRAVA_PER_PAGE: u32 = 200;
const MAX_PER_PAGE: u32 = 100;

impl RecentActivitiesQuery {
    fn into_activity_query(self) -> Result<ActivityQuery> {
        if self.page < 1 {
            return Err(AppError::BadRequest(
                "Page must be greater than 0".to_string(),
            ));
        }
        if self.per_page < 1 || self.per_page > MAX_STRAVA_PER_PAGE {
            return Err(AppError::BadRequest(format!(
                "per_page must be between 1 and {}",
                MAX_STRAVA_PER_PAGE
            )));
        }
        if let (Some(after), Some(before)) = (self.after, self.before) {
            if after >= before {
                return Err(AppError::BadRequest(
                    "'after' must be earlier than 'before'".to_string(),
                ));
            }
        }

        Ok(ActivityQuery {
            page: self.page,
            per_page: self.per_page,
            after: self.after,
            before: self.before,
        })
    }
}

/// Fetch recent activities from Strava, store them, and return them
/// normalized as `{connected, activities | error}`.
async fn get_recent_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(params): Query<RecentActivitiesQuery>,
) -> Result<Json<Value>> {
    tracing::debug!(user_id = user.id, params = ?params, "Fetching recent activities");

    let query = params.into_activity_query()?;
    let outcome = state.proxy.get_recent_activities(user.id, &query).await;

    Ok(Json(outcome.into_body("activities")))
}

// ─── Stored Activities ───────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

/// Response for stored activities.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityRecord>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Activities stored by previous syncs, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    if params.page < 1 {
        return Err(AppError::BadRequest(
            "Page must be greater than 0".to_string(),
        ));
    }

    let limit = params.per_page.clamp(1, MAX_PER_PAGE);
    let offset = (params.page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::BadRequest("Page number causes overflow".to_string()))?;

    let activities = state.db.list_activities(user.id, limit, offset).await?;
    let total = state.db.count_activities(user.id).await?;

    Ok(Json(ActivitiesResponse {
        activities,
        total,
        page: params.page,
        per_page: limit,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: u32, per_page: u32) -> RecentActivitiesQuery {
        RecentActivitiesQuery {
            page,
            per_page,
            after: None,
            before: None,
        }
    }

    #[test]
    fn test_recent_activities_query_bounds() {
        assert!(query(1, 200).into_activity_query().is_ok());
        assert!(query(0, 5).into_activity_query().is_err());
        assert!(query(1, 0).into_activity_query().is_err());
        assert!(query(1, 201).into_activity_query().is_err());
    }

    #[test]
    fn test_recent_activities_time_window() {
        let mut q = query(2, 10);
        q.after = Some(100);
        q.before = Some(200);
        let built = q.into_activity_query().unwrap();
        assert_eq!(built.page, 2);
        assert_eq!(built.after, Some(100));
        assert_eq!(built.before, Some(200));

        let mut inverted = query(1, 5);
        inverted.after = Some(200);
        inverted.before = Some(100);
        assert!(inverted.into_activity_query().is_err());
    }
}
