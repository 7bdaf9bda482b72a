// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored activity records.
//!
//! Writes take the caller's connection; reads for display go through the
//! pool on [`Database`].

use super::Database;
use crate::error::{AppError, StravaError};
use crate::models::ActivityRecord;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

fn persistence(e: sqlx::Error) -> StravaError {
    StravaError::Persistence(e.to_string())
}

/// Delete every stored activity of a user. Returns the number removed.
pub async fn delete_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<u64, StravaError> {
    let result = sqlx::query("DELETE FROM activities WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(persistence)?;
    Ok(result.rows_affected())
}

/// Insert a record, or update the existing row for the same
/// (user, Strava activity ID).
pub async fn upsert(
    conn: &mut SqliteConnection,
    record: &ActivityRecord,
) -> Result<(), StravaError> {
    sqlx::query(
        r"
        INSERT INTO activities (strava_id, user_id, name, category, distance_km,
                                average_speed_kmh, moving_time_secs, occurred_at, synced_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, strava_id) DO UPDATE SET
            name = excluded.name,
            category = excluded.category,
            distance_km = excluded.distance_km,
            average_speed_kmh = excluded.average_speed_kmh,
            moving_time_secs = excluded.moving_time_secs,
            occurred_at = excluded.occurred_at,
            synced_at = excluded.synced_at
        ",
    )
    .bind(record.strava_id as i64)
    .bind(record.user_id)
    .bind(&record.name)
    .bind(&record.category)
    .bind(record.distance_km)
    .bind(record.average_speed_kmh)
    .bind(record.moving_time_secs)
    .bind(record.occurred_at)
    .bind(record.synced_at)
    .execute(&mut *conn)
    .await
    .map_err(persistence)?;
    Ok(())
}

impl Database {
    // ─── Activity Operations ─────────────────────────────────────

    /// Stored activities for a user, newest first.
    pub async fn list_activities(
        &self,
        user_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        let rows = sqlx::query(
            r"
            SELECT strava_id, user_id, name, category, distance_km, average_speed_kmh,
                   moving_time_secs, occurred_at, synced_at
            FROM activities
            WHERE user_id = ?
            ORDER BY occurred_at DESC, strava_id DESC
            LIMIT ? OFFSET ?
            ",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.iter()
            .map(row_to_activity)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of stored activities for a user.
    pub async fn count_activities(&self, user_id: i64) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activities WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count as u64)
    }
}

fn row_to_activity(row: &SqliteRow) -> Result<ActivityRecord, sqlx::Error> {
    let strava_id: i64 = row.try_get("strava_id")?;
    Ok(ActivityRecord {
        strava_id: strava_id as u64,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        distance_km: row.try_get("distance_km")?,
        average_speed_kmh: row.try_get("average_speed_kmh")?,
        moving_time_secs: row.try_get("moving_time_secs")?,
        occurred_at: row.try_get("occurred_at")?,
        synced_at: row.try_get("synced_at")?,
    })
}
