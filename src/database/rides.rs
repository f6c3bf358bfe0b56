// ABOUTME: Instructor and ride database operations
// ABOUTME: Caches upstream class metadata and lists rides attached to tournaments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::profiles::raw_to_text;
use super::Database;
use crate::models::{Instructor, Ride};
use anyhow::Result;
use sqlx::Row;

impl Database {
    /// Create the instructors and rides tables
    pub(super) async fn migrate_rides(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS instructors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                peloton_id TEXT UNIQUE NOT NULL,
                name TEXT,
                image_url TEXT,
                raw TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS rides (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                peloton_id TEXT UNIQUE NOT NULL,
                title TEXT,
                description TEXT,
                image_url TEXT,
                scheduled_start_time TEXT,
                instructor_id INTEGER REFERENCES instructors(id),
                raw TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new instructor, assigning its row id
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn insert_instructor(&self, instructor: &mut Instructor) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO instructors (peloton_id, name, image_url, raw) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&instructor.peloton_id)
        .bind(&instructor.name)
        .bind(&instructor.image_url)
        .bind(raw_to_text(instructor.raw.as_ref())?)
        .execute(&self.pool)
        .await?;

        instructor.id = result.last_insert_rowid();
        Ok(())
    }

    /// Update an existing instructor
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_instructor(&self, instructor: &Instructor) -> Result<()> {
        sqlx::query(
            "UPDATE instructors SET name = ?1, image_url = ?2, raw = ?3 WHERE id = ?4",
        )
        .bind(&instructor.name)
        .bind(&instructor.image_url)
        .bind(raw_to_text(instructor.raw.as_ref())?)
        .bind(instructor.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get an instructor by upstream Peloton id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_instructor_by_peloton_id(
        &self,
        peloton_id: &str,
    ) -> Result<Option<Instructor>> {
        let row = sqlx::query(
            "SELECT id, peloton_id, name, image_url, raw FROM instructors WHERE peloton_id = ?1",
        )
        .bind(peloton_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_instructor).transpose()
    }

    /// Get an instructor by row id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_instructor(&self, instructor_id: i64) -> Result<Option<Instructor>> {
        let row = sqlx::query(
            "SELECT id, peloton_id, name, image_url, raw FROM instructors WHERE id = ?1",
        )
        .bind(instructor_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_instructor).transpose()
    }

    /// Insert a new ride, assigning its row id
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn insert_ride(&self, ride: &mut Ride) -> Result<()> {
        let result = sqlx::query(
            r"
            INSERT INTO rides
                (peloton_id, title, description, image_url, scheduled_start_time, instructor_id, raw)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(&ride.peloton_id)
        .bind(&ride.title)
        .bind(&ride.description)
        .bind(&ride.image_url)
        .bind(ride.scheduled_start_time)
        .bind(ride.instructor_id)
        .bind(raw_to_text(ride.raw.as_ref())?)
        .execute(&self.pool)
        .await?;

        ride.id = result.last_insert_rowid();
        Ok(())
    }

    /// Update an existing ride
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_ride(&self, ride: &Ride) -> Result<()> {
        sqlx::query(
            r"
            UPDATE rides
            SET title = ?1, description = ?2, image_url = ?3, scheduled_start_time = ?4,
                instructor_id = ?5, raw = ?6
            WHERE id = ?7
            ",
        )
        .bind(&ride.title)
        .bind(&ride.description)
        .bind(&ride.image_url)
        .bind(ride.scheduled_start_time)
        .bind(ride.instructor_id)
        .bind(raw_to_text(ride.raw.as_ref())?)
        .bind(ride.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a ride by upstream Peloton id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_ride_by_peloton_id(&self, peloton_id: &str) -> Result<Option<Ride>> {
        let row = sqlx::query(&ride_select("peloton_id = ?1"))
            .bind(peloton_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_ride).transpose()
    }

    /// Get a ride by row id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_ride(&self, ride_id: i64) -> Result<Option<Ride>> {
        let row = sqlx::query(&ride_select("id = ?1"))
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_ride).transpose()
    }

    /// Get the rides attached to a tournament, oldest air date first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_tournament_rides(&self, tournament_id: i64) -> Result<Vec<Ride>> {
        let rows = sqlx::query(
            r"
            SELECT r.id, r.peloton_id, r.title, r.description, r.image_url,
                   r.scheduled_start_time, r.instructor_id, r.raw
            FROM rides r
            JOIN tournament_rides tr ON tr.ride_id = r.id
            WHERE tr.tournament_id = ?1
            ORDER BY r.scheduled_start_time ASC, r.id ASC
            ",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_ride).collect()
    }

    /// Get the rides attached to a tournament with their instructors
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_tournament_rides_with_instructors(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<(Ride, Option<Instructor>)>> {
        let rides = self.get_tournament_rides(tournament_id).await?;

        let mut out = Vec::with_capacity(rides.len());
        for ride in rides {
            let instructor = match ride.instructor_id {
                Some(instructor_id) => self.get_instructor(instructor_id).await?,
                None => None,
            };
            out.push((ride, instructor));
        }

        Ok(out)
    }

    /// Get the upstream ids of a tournament's attached rides
    ///
    /// Used to bound the workout fetch during synchronization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_tournament_ride_peloton_ids(&self, tournament_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r"
            SELECT r.peloton_id
            FROM rides r
            JOIN tournament_rides tr ON tr.ride_id = r.id
            WHERE tr.tournament_id = ?1
            ORDER BY r.id ASC
            ",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("peloton_id").map_err(Into::into))
            .collect()
    }

    /// Convert a database row to an Instructor struct
    fn row_to_instructor(row: &sqlx::sqlite::SqliteRow) -> Result<Instructor> {
        let raw: Option<String> = row.try_get("raw")?;
        Ok(Instructor {
            id: row.try_get("id")?,
            peloton_id: row.try_get("peloton_id")?,
            name: row.try_get("name")?,
            image_url: row.try_get("image_url")?,
            raw: raw.map(|text| serde_json::from_str(&text)).transpose()?,
        })
    }

    /// Convert a database row to a Ride struct
    fn row_to_ride(row: &sqlx::sqlite::SqliteRow) -> Result<Ride> {
        let raw: Option<String> = row.try_get("raw")?;
        Ok(Ride {
            id: row.try_get("id")?,
            peloton_id: row.try_get("peloton_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            image_url: row.try_get("image_url")?,
            scheduled_start_time: row.try_get("scheduled_start_time")?,
            instructor_id: row.try_get("instructor_id")?,
            raw: raw.map(|text| serde_json::from_str(&text)).transpose()?,
        })
    }
}

/// Render the standard ride SELECT with the given WHERE clause
fn ride_select(where_clause: &str) -> String {
    format!(
        "SELECT id, peloton_id, title, description, image_url, scheduled_start_time, \
         instructor_id, raw FROM rides WHERE {where_clause}"
    )
}
