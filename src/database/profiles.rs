// ABOUTME: Peloton profile database operations
// ABOUTME: Stores riders by peloton id or username alone, plus account links and sealed sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::Database;
use crate::models::{PelotonProfile, SealedSessionToken};
use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the peloton_profiles table
    pub(super) async fn migrate_profiles(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS peloton_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                peloton_id TEXT UNIQUE,
                username TEXT UNIQUE NOT NULL,
                image_url TEXT,
                user_id TEXT UNIQUE REFERENCES users(id),
                session_token TEXT,
                last_linked TEXT,
                raw TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_profiles_peloton_id ON peloton_profiles(peloton_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new profile, assigning its row id
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (including uniqueness violations
    /// on `peloton_id` or `username`)
    pub async fn insert_profile(&self, profile: &mut PelotonProfile) -> Result<()> {
        let result = sqlx::query(
            r"
            INSERT INTO peloton_profiles
                (peloton_id, username, image_url, user_id, session_token, last_linked, raw)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(&profile.peloton_id)
        .bind(&profile.username)
        .bind(&profile.image_url)
        .bind(profile.user_id.map(|id| id.to_string()))
        .bind(profile.session_token.as_ref().map(|t| t.sealed.clone()))
        .bind(profile.last_linked)
        .bind(raw_to_text(profile.raw.as_ref())?)
        .execute(&self.pool)
        .await?;

        profile.id = result.last_insert_rowid();
        Ok(())
    }

    /// Update an existing profile's mutable columns
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_profile(&self, profile: &PelotonProfile) -> Result<()> {
        sqlx::query(
            r"
            UPDATE peloton_profiles
            SET peloton_id = ?1, username = ?2, image_url = ?3, user_id = ?4,
                session_token = ?5, last_linked = ?6, raw = ?7
            WHERE id = ?8
            ",
        )
        .bind(&profile.peloton_id)
        .bind(&profile.username)
        .bind(&profile.image_url)
        .bind(profile.user_id.map(|id| id.to_string()))
        .bind(profile.session_token.as_ref().map(|t| t.sealed.clone()))
        .bind(profile.last_linked)
        .bind(raw_to_text(profile.raw.as_ref())?)
        .bind(profile.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a profile by row id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_profile(&self, profile_id: i64) -> Result<Option<PelotonProfile>> {
        let row = sqlx::query(&profile_select("id = ?1"))
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    /// Get a profile by upstream Peloton id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_profile_by_peloton_id(
        &self,
        peloton_id: &str,
    ) -> Result<Option<PelotonProfile>> {
        let row = sqlx::query(&profile_select("peloton_id = ?1"))
            .bind(peloton_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    /// Get a profile by leaderboard username
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_profile_by_username(&self, username: &str) -> Result<Option<PelotonProfile>> {
        let row = sqlx::query(&profile_select("username = ?1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    /// Get a profile matching either key, preferring whichever exists
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_profile_by_peloton_id_or_username(
        &self,
        peloton_id: Option<&str>,
        username: Option<&str>,
    ) -> Result<Option<PelotonProfile>> {
        let row = match (peloton_id, username) {
            (Some(peloton_id), Some(username)) => {
                sqlx::query(&profile_select("peloton_id = ?1 OR username = ?2"))
                    .bind(peloton_id)
                    .bind(username)
                    .fetch_optional(&self.pool)
                    .await?
            }
            (Some(peloton_id), None) => {
                sqlx::query(&profile_select("peloton_id = ?1"))
                    .bind(peloton_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            (None, Some(username)) => {
                sqlx::query(&profile_select("username = ?1"))
                    .bind(username)
                    .fetch_optional(&self.pool)
                    .await?
            }
            (None, None) => None,
        };

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    /// Get the profile linked to a local account
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_profile_by_user(&self, user_id: Uuid) -> Result<Option<PelotonProfile>> {
        let row = sqlx::query(&profile_select("user_id = ?1"))
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    /// Get the participants of a tournament, ordered by username
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_tournament_participants(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<PelotonProfile>> {
        let rows = sqlx::query(
            r"
            SELECT p.id, p.peloton_id, p.username, p.image_url, p.user_id,
                   p.session_token, p.last_linked, p.raw
            FROM peloton_profiles p
            JOIN tournament_members m ON m.profile_id = p.id
            WHERE m.tournament_id = ?1
            ORDER BY p.username ASC
            ",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_profile).collect()
    }

    /// Convert a database row to a PelotonProfile struct
    fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<PelotonProfile> {
        let user_id: Option<String> = row.try_get("user_id")?;
        let session_token: Option<String> = row.try_get("session_token")?;
        let raw: Option<String> = row.try_get("raw")?;

        Ok(PelotonProfile {
            id: row.try_get("id")?,
            peloton_id: row.try_get("peloton_id")?,
            username: row.try_get("username")?,
            image_url: row.try_get("image_url")?,
            user_id: user_id.map(|id| Uuid::parse_str(&id)).transpose()?,
            session_token: session_token.map(|sealed| SealedSessionToken { sealed }),
            last_linked: row.try_get("last_linked")?,
            raw: raw.map(|text| serde_json::from_str(&text)).transpose()?,
        })
    }
}

/// Render the standard profile SELECT with the given WHERE clause
fn profile_select(where_clause: &str) -> String {
    format!(
        "SELECT id, peloton_id, username, image_url, user_id, session_token, last_linked, raw \
         FROM peloton_profiles WHERE {where_clause}"
    )
}

/// Serialize a raw payload for TEXT storage
pub(super) fn raw_to_text(raw: Option<&serde_json::Value>) -> Result<Option<String>> {
    raw.map(|value| serde_json::to_string(value).map_err(Into::into))
        .transpose()
}
