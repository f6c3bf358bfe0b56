// ABOUTME: Team and membership database operations
// ABOUTME: Handles team rows, membership rows, role changes, and team reassignment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::{generate_public_id, Database};
use crate::models::{MemberRole, Membership, PelotonProfile, Team};
use anyhow::Result;
use sqlx::Row;

impl Database {
    /// Create the tournament_teams and tournament_members tables
    pub(super) async fn migrate_teams(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tournament_teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                public_id TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // A rider holds one membership per tournament; team moves rewrite
        // the row rather than adding another
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tournament_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                public_id TEXT UNIQUE NOT NULL,
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                profile_id INTEGER NOT NULL REFERENCES peloton_profiles(id),
                team_id INTEGER REFERENCES tournament_teams(id) ON DELETE SET NULL,
                role TEXT NOT NULL DEFAULT 'member'
                    CHECK (role IN ('owner', 'manager', 'member')),
                UNIQUE (tournament_id, profile_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_members_tournament ON tournament_members(tournament_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a team with a fresh public id
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_team(&self, tournament_id: i64, name: &str) -> Result<Team> {
        let mut team = Team {
            id: 0,
            public_id: generate_public_id(),
            name: name.to_owned(),
            tournament_id,
        };

        let result = sqlx::query(
            "INSERT INTO tournament_teams (public_id, name, tournament_id) VALUES (?1, ?2, ?3)",
        )
        .bind(&team.public_id)
        .bind(&team.name)
        .bind(team.tournament_id)
        .execute(&self.pool)
        .await?;

        team.id = result.last_insert_rowid();
        Ok(team)
    }

    /// Get a team by public id, scoped to its tournament
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_team_by_public_id(
        &self,
        tournament_id: i64,
        public_id: &str,
    ) -> Result<Option<Team>> {
        let row = sqlx::query(
            r"
            SELECT id, public_id, name, tournament_id
            FROM tournament_teams
            WHERE tournament_id = ?1 AND public_id = ?2
            ",
        )
        .bind(tournament_id)
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_team).transpose()
    }

    /// List a tournament's teams, by name
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_tournament_teams(&self, tournament_id: i64) -> Result<Vec<Team>> {
        let rows = sqlx::query(
            r"
            SELECT id, public_id, name, tournament_id
            FROM tournament_teams
            WHERE tournament_id = ?1
            ORDER BY name ASC
            ",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_team).collect()
    }

    /// Delete a team, detaching its memberships first
    ///
    /// Membership rows survive with `team_id` null; only the team row goes.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails
    pub async fn delete_team(&self, team_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE tournament_members SET team_id = NULL WHERE team_id = ?1")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tournament_teams WHERE id = ?1")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add a rider to a tournament
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including the uniqueness
    /// violation when the rider is already a member
    pub async fn add_member(
        &self,
        tournament_id: i64,
        profile_id: i64,
        role: MemberRole,
    ) -> Result<Membership> {
        let mut membership = Membership {
            id: 0,
            public_id: generate_public_id(),
            tournament_id,
            profile_id,
            team_id: None,
            role,
        };

        let result = sqlx::query(
            r"
            INSERT INTO tournament_members (public_id, tournament_id, profile_id, role)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(&membership.public_id)
        .bind(membership.tournament_id)
        .bind(membership.profile_id)
        .bind(membership.role.as_str())
        .execute(&self.pool)
        .await?;

        membership.id = result.last_insert_rowid();
        Ok(membership)
    }

    /// Get a membership by public id, scoped to its tournament
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_membership_by_public_id(
        &self,
        tournament_id: i64,
        public_id: &str,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query(&membership_select("tournament_id = ?1 AND public_id = ?2"))
            .bind(tournament_id)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_membership).transpose()
    }

    /// Get a rider's membership in a tournament, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_membership_for_profile(
        &self,
        tournament_id: i64,
        profile_id: i64,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query(&membership_select("tournament_id = ?1 AND profile_id = ?2"))
            .bind(tournament_id)
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_membership).transpose()
    }

    /// List a tournament's memberships with their profiles
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_memberships_with_profiles(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<(Membership, PelotonProfile)>> {
        let rows = sqlx::query(
            r"
            SELECT m.id, m.public_id, m.tournament_id, m.profile_id, m.team_id, m.role,
                   p.id AS p_id, p.peloton_id AS p_peloton_id, p.username AS p_username,
                   p.image_url AS p_image_url
            FROM tournament_members m
            JOIN peloton_profiles p ON p.id = m.profile_id
            WHERE m.tournament_id = ?1
            ORDER BY p.username ASC
            ",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let membership = Self::row_to_membership(row)?;
                let profile = PelotonProfile {
                    id: row.try_get("p_id")?,
                    peloton_id: row.try_get("p_peloton_id")?,
                    username: row.try_get("p_username")?,
                    image_url: row.try_get("p_image_url")?,
                    user_id: None,
                    session_token: None,
                    last_linked: None,
                    raw: None,
                };
                Ok((membership, profile))
            })
            .collect()
    }

    /// Remove a membership row
    ///
    /// Returns whether the row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_membership(&self, membership_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tournament_members WHERE id = ?1")
            .bind(membership_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a membership to a team (or to unassigned)
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn set_membership_team(
        &self,
        membership_id: i64,
        team_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query("UPDATE tournament_members SET team_id = ?1 WHERE id = ?2")
            .bind(team_id)
            .bind(membership_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Change a membership's role
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn set_membership_role(&self, membership_id: i64, role: MemberRole) -> Result<()> {
        sqlx::query("UPDATE tournament_members SET role = ?1 WHERE id = ?2")
            .bind(role.as_str())
            .bind(membership_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Whether a rider administers a tournament (owner or manager role)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn is_tournament_admin(&self, tournament_id: i64, profile_id: i64) -> Result<bool> {
        let row = sqlx::query(
            r"
            SELECT EXISTS (
                SELECT 1 FROM tournament_members
                WHERE tournament_id = ?1 AND profile_id = ?2 AND role IN ('owner', 'manager')
            ) AS is_admin
            ",
        )
        .bind(tournament_id)
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        let is_admin: i64 = row.try_get("is_admin")?;
        Ok(is_admin != 0)
    }

    /// Convert a database row to a Team struct
    fn row_to_team(row: &sqlx::sqlite::SqliteRow) -> Result<Team> {
        Ok(Team {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            name: row.try_get("name")?,
            tournament_id: row.try_get("tournament_id")?,
        })
    }

    /// Convert a database row to a Membership struct
    fn row_to_membership(row: &sqlx::sqlite::SqliteRow) -> Result<Membership> {
        let role: String = row.try_get("role")?;
        Ok(Membership {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            tournament_id: row.try_get("tournament_id")?,
            profile_id: row.try_get("profile_id")?,
            team_id: row.try_get("team_id")?,
            role: MemberRole::parse(&role)?,
        })
    }
}

/// Render the standard membership SELECT with the given WHERE clause
fn membership_select(where_clause: &str) -> String {
    format!(
        "SELECT id, public_id, tournament_id, profile_id, team_id, role \
         FROM tournament_members WHERE {where_clause}"
    )
}
