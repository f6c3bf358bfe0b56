// ABOUTME: Local account database operations
// ABOUTME: Lazily materializes accounts for verified bearer-token subjects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::Database;
use crate::models::User;
use anyhow::Result;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the users table
    pub(super) async fn migrate_users(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                display_name TEXT,
                created_at TEXT NOT NULL,
                last_active TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Fetch or lazily create the account for a verified token subject
    ///
    /// Existing accounts get their `last_active` stamp refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn ensure_user(&self, email: &str, display_name: Option<&str>) -> Result<User> {
        if let Some(mut user) = self.get_user_by_email(email).await? {
            user.last_active = Utc::now();
            sqlx::query("UPDATE users SET last_active = ?1 WHERE id = ?2")
                .bind(user.last_active)
                .bind(user.id.to_string())
                .execute(&self.pool)
                .await?;
            return Ok(user);
        }

        let user = User::new(email.to_owned(), display_name.map(str::to_owned));
        sqlx::query(
            r"
            INSERT INTO users (id, email, display_name, created_at, last_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.created_at)
        .bind(user.last_active)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, display_name, created_at, last_active FROM users WHERE id = ?1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Get a user by email
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, display_name, created_at, last_active FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Convert a database row to a User struct
    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id: String = row.try_get("id")?;
        Ok(User {
            id: Uuid::parse_str(&id)?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            created_at: row.try_get("created_at")?,
            last_active: row.try_get("last_active")?,
        })
    }
}
