// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity sync: normalize a page of Strava activities and reconcile it
//! with the stored records of one user.

use crate::db::activities;
use crate::error::StravaError;
use crate::models::{ActivityRecord, NormalizedActivity};
use crate::services::strava::RemoteActivity;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::str::FromStr;

/// How a synced batch is reconciled with what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Insert or update by Strava activity ID; stored records that are not in
    /// the batch are kept.
    #[default]
    Upsert,
    /// Delete all of the user's records, then insert the batch.
    Replace,
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(SyncPolicy::Upsert),
            "replace" => Ok(SyncPolicy::Replace),
            other => Err(format!("unknown sync policy '{}'", other)),
        }
    }
}

/// Round to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a Strava summary activity to client units (km, km/h).
pub fn normalize(remote: &RemoteActivity) -> NormalizedActivity {
    let meters = remote.distance.unwrap_or(0.0);
    let meters_per_sec = remote.average_speed.unwrap_or(0.0);

    NormalizedActivity {
        id: remote.id,
        name: remote.name.clone(),
        category: remote
            .activity_type
            .clone()
            .or_else(|| remote.sport_type.clone()),
        start_date: remote.start_date.clone(),
        distance: round2(meters / 1000.0),
        moving_time: remote.moving_time.unwrap_or(0),
        average_speed: round2(meters_per_sec * 3.6),
    }
}

fn to_record(user_id: i64, activity: &NormalizedActivity, now: DateTime<Utc>) -> ActivityRecord {
    let occurred_at = activity
        .start_date
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);

    ActivityRecord {
        strava_id: activity.id,
        user_id,
        name: activity.name.clone(),
        category: activity.category.clone(),
        distance_km: activity.distance,
        average_speed_kmh: activity.average_speed,
        moving_time_secs: activity.moving_time,
        occurred_at,
        synced_at: now,
    }
}

/// Normalize `batch` and write it for `user_id` on the caller's connection.
///
/// On error nothing should be committed: the caller drops or rolls back the
/// transaction and gets `StravaError::Persistence` instead of the list.
pub async fn sync(
    conn: &mut SqliteConnection,
    user_id: i64,
    batch: &[RemoteActivity],
    policy: SyncPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<NormalizedActivity>, StravaError> {
    let normalized: Vec<NormalizedActivity> = batch.iter().map(normalize).collect();

    if policy == SyncPolicy::Replace {
        let removed = activities::delete_for_user(&mut *conn, user_id).await?;
        tracing::debug!(user_id, removed, "Cleared stored activities before sync");
    }

    for activity in &normalized {
        activities::upsert(&mut *conn, &to_record(user_id, activity, now)).await?;
    }

    tracing::info!(
        user_id,
        count = normalized.len(),
        policy = ?policy,
        "Synced activities"
    );

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: u64) -> RemoteActivity {
        RemoteActivity {
            id,
            name: Some(format!("Activity {}", id)),
            activity_type: Some("Ride".to_string()),
            sport_type: None,
            start_date: Some("2026-03-01T08:00:00Z".to_string()),
            distance: Some(10_000.0),
            moving_time: Some(1_800),
            average_speed: Some(5.0),
        }
    }

    #[test]
    fn test_normalize_units() {
        let n = normalize(&remote(1));
        assert_eq!(n.distance, 10.0);
        assert_eq!(n.average_speed, 18.0);
        assert_eq!(n.moving_time, 1_800);
        assert_eq!(n.category.as_deref(), Some("Ride"));
    }

    #[test]
    fn test_normalize_rounds_to_two_decimals() {
        let mut activity = remote(1);
        activity.distance = Some(12_345.678);
        activity.average_speed = Some(3.3333);

        let n = normalize(&activity);
        assert_eq!(n.distance, 12.35);
        assert_eq!(n.average_speed, 12.0);
    }

    #[test]
    fn test_normalize_missing_fields_are_zero() {
        let n = normalize(&RemoteActivity {
            id: 9,
            ..Default::default()
        });
        assert_eq!(n.distance, 0.0);
        assert_eq!(n.average_speed, 0.0);
        assert_eq!(n.moving_time, 0);
        assert_eq!(n.name, None);
    }

    #[test]
    fn test_category_falls_back_to_sport_type() {
        let n = normalize(&RemoteActivity {
            id: 3,
            sport_type: Some("GravelRide".to_string()),
            ..Default::default()
        });
        assert_eq!(n.category.as_deref(), Some("GravelRide"));
    }

    #[test]
    fn test_occurred_at_from_start_date() {
        let now = Utc::now();
        let record = to_record(1, &normalize(&remote(5)), now);
        assert_eq!(record.occurred_at.to_rfc3339(), "2026-03-01T08:00:00+00:00");
        assert_eq!(record.synced_at, now);

        let undated = to_record(1, &normalize(&RemoteActivity { id: 6, ..Default::default() }), now);
        assert_eq!(undated.occurred_at, now);
    }

    #[test]
    fn test_sync_policy_parse() {
        assert_eq!("upsert".parse::<SyncPolicy>(), Ok(SyncPolicy::Upsert));
        assert_eq!(" Replace ".parse::<SyncPolicy>(), Ok(SyncPolicy::Replace));
        assert!("merge".parse::<SyncPolicy>().is_err());
        assert_eq!(SyncPolicy::default(), SyncPolicy::Upsert);
    }
}
