// ABOUTME: Workout database operations
// ABOUTME: Stores each rider's recorded attempts with status, timing, and output columns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::profiles::raw_to_text;
use super::Database;
use crate::models::Workout;
use anyhow::Result;
use sqlx::Row;

impl Database {
    /// Create the workouts table
    pub(super) async fn migrate_workouts(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                peloton_id TEXT UNIQUE NOT NULL,
                ride_id INTEGER REFERENCES rides(id),
                profile_id INTEGER NOT NULL REFERENCES peloton_profiles(id),
                status TEXT,
                start_time TEXT,
                end_time TEXT,
                total_work REAL,
                raw TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_workouts_profile ON workouts(profile_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_workouts_ride ON workouts(ride_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new workout, assigning its row id
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn insert_workout(&self, workout: &mut Workout) -> Result<()> {
        let result = sqlx::query(
            r"
            INSERT INTO workouts
                (peloton_id, ride_id, profile_id, status, start_time, end_time, total_work, raw)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(&workout.peloton_id)
        .bind(workout.ride_id)
        .bind(workout.profile_id)
        .bind(&workout.status)
        .bind(workout.start_time)
        .bind(workout.end_time)
        .bind(workout.total_work)
        .bind(raw_to_text(workout.raw.as_ref())?)
        .execute(&self.pool)
        .await?;

        workout.id = result.last_insert_rowid();
        Ok(())
    }

    /// Update an existing workout
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_workout(&self, workout: &Workout) -> Result<()> {
        sqlx::query(
            r"
            UPDATE workouts
            SET ride_id = ?1, profile_id = ?2, status = ?3, start_time = ?4,
                end_time = ?5, total_work = ?6, raw = ?7
            WHERE id = ?8
            ",
        )
        .bind(workout.ride_id)
        .bind(workout.profile_id)
        .bind(&workout.status)
        .bind(workout.start_time)
        .bind(workout.end_time)
        .bind(workout.total_work)
        .bind(raw_to_text(workout.raw.as_ref())?)
        .bind(workout.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a workout by upstream Peloton id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_workout_by_peloton_id(&self, peloton_id: &str) -> Result<Option<Workout>> {
        let row = sqlx::query(&workout_select("peloton_id = ?1"))
            .bind(peloton_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_workout).transpose()
    }

    /// Get a workout by row id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_workout(&self, workout_id: i64) -> Result<Option<Workout>> {
        let row = sqlx::query(&workout_select("id = ?1"))
            .bind(workout_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_workout).transpose()
    }

    /// List a profile's workouts, most recent start first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_workouts_for_profile(&self, profile_id: i64) -> Result<Vec<Workout>> {
        let rows = sqlx::query(
            r"
            SELECT id, peloton_id, ride_id, profile_id, status, start_time, end_time,
                   total_work, raw
            FROM workouts
            WHERE profile_id = ?1
            ORDER BY start_time DESC, id DESC
            ",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_workout).collect()
    }

    /// Convert a database row to a Workout struct
    pub(super) fn row_to_workout(row: &sqlx::sqlite::SqliteRow) -> Result<Workout> {
        let raw: Option<String> = row.try_get("raw")?;
        Ok(Workout {
            id: row.try_get("id")?,
            peloton_id: row.try_get("peloton_id")?,
            ride_id: row.try_get("ride_id")?,
            profile_id: row.try_get("profile_id")?,
            status: row.try_get("status")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            total_work: row.try_get("total_work")?,
            raw: raw.map(|text| serde_json::from_str(&text)).transpose()?,
        })
    }
}

/// Render the standard workout SELECT with the given WHERE clause
fn workout_select(where_clause: &str) -> String {
    format!(
        "SELECT id, peloton_id, ride_id, profile_id, status, start_time, end_time, \
         total_work, raw FROM workouts WHERE {where_clause}"
    )
}
