// ABOUTME: Tournament database operations
// ABOUTME: Covers tournament rows, ride attachments, and the upcoming/active/recent buckets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::{generate_public_id, Database};
use crate::models::{Tournament, TournamentFormat, TournamentVisibility};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

/// Time-bucketed tournament listing for a rider
#[derive(Debug, Default)]
pub struct TournamentBuckets {
    /// Starting within the next two weeks
    pub upcoming: Vec<Tournament>,
    /// Currently inside their window
    pub active: Vec<Tournament>,
    /// Ended within the last two weeks
    pub recent: Vec<Tournament>,
}

impl Database {
    /// Create the tournaments and tournament_rides tables
    pub(super) async fn migrate_tournaments(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tournaments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                public_id TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                format TEXT NOT NULL DEFAULT 'simple',
                visibility TEXT NOT NULL DEFAULT 'private'
                    CHECK (visibility IN ('public', 'private')),
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                last_synced TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tournament_rides (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                ride_id INTEGER NOT NULL REFERENCES rides(id),
                UNIQUE (tournament_id, ride_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a tournament with a fresh public id
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_tournament(
        &self,
        name: &str,
        visibility: TournamentVisibility,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Tournament> {
        let mut tournament = Tournament {
            id: 0,
            public_id: generate_public_id(),
            name: name.to_owned(),
            format: TournamentFormat::Simple,
            visibility,
            start_date,
            end_date,
            last_synced: None,
        };

        let result = sqlx::query(
            r"
            INSERT INTO tournaments (public_id, name, format, visibility, start_date, end_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&tournament.public_id)
        .bind(&tournament.name)
        .bind(tournament.format.as_str())
        .bind(tournament.visibility.as_str())
        .bind(tournament.start_date)
        .bind(tournament.end_date)
        .execute(&self.pool)
        .await?;

        tournament.id = result.last_insert_rowid();
        Ok(tournament)
    }

    /// Get a tournament by its public id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_tournament_by_public_id(
        &self,
        public_id: &str,
    ) -> Result<Option<Tournament>> {
        let row = sqlx::query(&tournament_select("public_id = ?1"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_tournament).transpose()
    }

    /// Get a tournament by row id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_tournament(&self, tournament_id: i64) -> Result<Option<Tournament>> {
        let row = sqlx::query(&tournament_select("id = ?1"))
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_tournament).transpose()
    }

    /// Write back a tournament's mutable columns
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_tournament(&self, tournament: &Tournament) -> Result<()> {
        sqlx::query(
            r"
            UPDATE tournaments
            SET name = ?1, visibility = ?2, start_date = ?3, end_date = ?4, last_synced = ?5
            WHERE id = ?6
            ",
        )
        .bind(&tournament.name)
        .bind(tournament.visibility.as_str())
        .bind(tournament.start_date)
        .bind(tournament.end_date)
        .bind(tournament.last_synced)
        .bind(tournament.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List a rider's tournaments in upcoming/active/recent buckets
    ///
    /// Upcoming means starting within two weeks, recent means ended within
    /// two weeks; each bucket is ordered by start date, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails
    pub async fn get_tournament_buckets(
        &self,
        profile_id: i64,
        now: DateTime<Utc>,
    ) -> Result<TournamentBuckets> {
        let horizon = Duration::weeks(2);

        let upcoming = self
            .bucket_query(
                profile_id,
                "t.start_date > ?2 AND t.start_date <= ?3",
                now,
                now + horizon,
            )
            .await?;
        let active = self
            .bucket_query(
                profile_id,
                "t.start_date <= ?2 AND t.end_date >= ?3",
                now,
                now,
            )
            .await?;
        let recent = self
            .bucket_query(
                profile_id,
                "t.end_date < ?2 AND t.end_date >= ?3",
                now,
                now - horizon,
            )
            .await?;

        Ok(TournamentBuckets {
            upcoming,
            active,
            recent,
        })
    }

    async fn bucket_query(
        &self,
        profile_id: i64,
        window_clause: &str,
        first_bound: DateTime<Utc>,
        second_bound: DateTime<Utc>,
    ) -> Result<Vec<Tournament>> {
        let query = format!(
            r"
            SELECT t.id, t.public_id, t.name, t.format, t.visibility,
                   t.start_date, t.end_date, t.last_synced
            FROM tournaments t
            JOIN tournament_members m ON m.tournament_id = t.id
            WHERE m.profile_id = ?1 AND {window_clause}
            ORDER BY t.start_date DESC
            "
        );

        let rows = sqlx::query(&query)
            .bind(profile_id)
            .bind(first_bound)
            .bind(second_bound)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_tournament).collect()
    }

    /// Attach a ride to a tournament; attaching twice is a no-op
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn attach_ride(&self, tournament_id: i64, ride_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO tournament_rides (tournament_id, ride_id) VALUES (?1, ?2)",
        )
        .bind(tournament_id)
        .bind(ride_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Detach a ride from a tournament by its upstream id
    ///
    /// Returns whether an attachment existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn detach_ride(&self, tournament_id: i64, ride_peloton_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM tournament_rides
            WHERE tournament_id = ?1
              AND ride_id IN (SELECT id FROM rides WHERE peloton_id = ?2)
            ",
        )
        .bind(tournament_id)
        .bind(ride_peloton_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Convert a database row to a Tournament struct
    fn row_to_tournament(row: &sqlx::sqlite::SqliteRow) -> Result<Tournament> {
        let format: String = row.try_get("format")?;
        let visibility: String = row.try_get("visibility")?;

        Ok(Tournament {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            name: row.try_get("name")?,
            format: TournamentFormat::parse(&format)?,
            visibility: TournamentVisibility::parse(&visibility)?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            last_synced: row.try_get("last_synced")?,
        })
    }
}

/// Render the standard tournament SELECT with the given WHERE clause
fn tournament_select(where_clause: &str) -> String {
    format!(
        "SELECT id, public_id, name, format, visibility, start_date, end_date, last_synced \
         FROM tournaments WHERE {where_clause}"
    )
}
