// ABOUTME: Database management for tournament, profile, and workout storage
// ABOUTME: Owns the SQLite pool, schema migrations, and the public-id generator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Database Management
//!
//! SQLite-backed storage for the Pelotourney server. Schema migrations are
//! idempotent `CREATE TABLE IF NOT EXISTS` statements run at startup; each
//! entity's queries live in its own submodule as `impl Database` blocks.
//!
//! Row ids never cross the HTTP boundary. Tournament-scoped entities carry a
//! 21-character alphanumeric `public_id` used in URLs and payloads.

mod leaderboard;
mod profiles;
mod rides;
mod teams;
mod tournaments;
mod users;
mod workouts;

pub use leaderboard::TeamStanding;
pub use tournaments::TournamentBuckets;

use anyhow::Result;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};

/// Database manager for tournament and Peloton entity storage
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
    sealing_key: Vec<u8>,
}

impl Database {
    /// Create a new database connection
    ///
    /// Callers run [`Database::migrate`] separately; the server does so at
    /// startup when `AUTO_MIGRATE` is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established
    pub async fn new(database_url: &str, sealing_key: Vec<u8>) -> Result<Self> {
        let pool = if database_url.contains(":memory:") {
            // A pooled in-memory database is one database per connection;
            // pin the pool to a single long-lived connection
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await?
        } else {
            // Ensure SQLite creates the database file if it doesn't exist
            SqlitePool::connect(&format!("{database_url}?mode=rwc")).await?
        };

        Ok(Self { pool, sealing_key })
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Key used to seal and open stored Peloton session ids
    #[must_use]
    pub fn sealing_key(&self) -> &[u8] {
        &self.sealing_key
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if a schema statement fails
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_users().await?;
        self.migrate_profiles().await?;
        self.migrate_rides().await?;
        self.migrate_workouts().await?;
        self.migrate_tournaments().await?;
        self.migrate_teams().await?;

        Ok(())
    }
}

/// Generate a 21-character alphanumeric public identifier
///
/// Used for tournaments, teams, and memberships anywhere an identifier
/// leaves the database layer.
#[must_use]
pub fn generate_public_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(21)
        .map(char::from)
        .collect()
}
