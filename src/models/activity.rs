// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity models for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored activity record, unique per (user, Strava activity ID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityRecord {
    /// Strava activity ID
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub strava_id: u64,
    /// Owning local user
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: i64,
    pub name: Option<String>,
    /// Sport type (Ride, Run, Hike, etc.)
    pub category: Option<String>,
    /// Distance in kilometers, rounded to 2 decimals
    pub distance_km: f64,
    /// Average speed in km/h, rounded to 2 decimals
    pub average_speed_kmh: f64,
    /// Moving time in seconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub moving_time_secs: i64,
    /// When the activity started
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub occurred_at: DateTime<Utc>,
    /// When this row was last written by a sync
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub synced_at: DateTime<Utc>,
}

/// Normalized activity as returned to clients after a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NormalizedActivity {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub start_date: Option<String>,
    /// Kilometers
    pub distance: f64,
    /// Seconds
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub moving_time: i64,
    /// km/h
    pub average_speed: f64,
}
