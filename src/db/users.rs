// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local account queries.

use super::Database;
use crate::error::AppError;
use crate::models::{NewUser, User};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     strava_athlete_id, created_at, updated_at, last_login";

impl Database {
    // ─── User Operations ─────────────────────────────────────────

    /// Create a new account.
    ///
    /// A duplicate username or email is reported as `BadRequest`.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        let now = Utc::now();

        let result = sqlx::query(
            r"
            INSERT INTO users (username, email, password_hash, first_name, last_name,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::BadRequest("Username or email already exists".to_string())
            }
            other => AppError::Database(other.to_string()),
        })?;

        let id = result.last_insert_rowid();
        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::Database(format!("User {} missing after insert", id)))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Record a successful login.
    pub async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, AppError> {
    let map = |e: sqlx::Error| AppError::Database(e.to_string());

    let strava_athlete_id: Option<i64> = row.try_get("strava_athlete_id").map_err(map)?;

    Ok(User {
        id: row.try_get("id").map_err(map)?,
        username: row.try_get("username").map_err(map)?,
        email: row.try_get("email").map_err(map)?,
        password_hash: row.try_get("password_hash").map_err(map)?,
        first_name: row.try_get("first_name").map_err(map)?,
        last_name: row.try_get("last_name").map_err(map)?,
        strava_athlete_id: strava_athlete_id.map(|id| id as u64),
        created_at: row.try_get("created_at").map_err(map)?,
        updated_at: row.try_get("updated_at").map_err(map)?,
        last_login: row.try_get("last_login").map_err(map)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: Option<&str>) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.map(String::from),
            password_hash: "hash".to_string(),
            first_name: Some("Test".to_string()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = Database::in_memory().await.unwrap();

        let created = db
            .create_user(&new_user("alice", Some("alice@example.com")))
            .await
            .unwrap();

        let by_id = db.get_user(created.id).await.unwrap().unwrap();
        let by_name = db.get_user_by_username("alice").await.unwrap().unwrap();

        assert_eq!(by_id.username, "alice");
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_id.strava_athlete_id, None);
        assert!(by_id.last_login.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = Database::in_memory().await.unwrap();
        db.create_user(&new_user("bob", None)).await.unwrap();

        let err = db.create_user(&new_user("bob", None)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_record_login() {
        let db = Database::in_memory().await.unwrap();
        let user = db.create_user(&new_user("carol", None)).await.unwrap();

        let at = Utc::now();
        db.record_login(user.id, at).await.unwrap();

        let fetched = db.get_user(user.id).await.unwrap().unwrap();
        assert!(fetched.last_login.is_some());
    }
}
