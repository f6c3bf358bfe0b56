// ABOUTME: Leaderboard database queries built on SQL window functions
// ABOUTME: Computes per-ride best workouts and team output totals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::Database;
use crate::models::{Team, Workout};
use anyhow::Result;
use serde::Serialize;
use sqlx::Row;

/// One team's row on the leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct TeamStanding {
    pub team: Team,
    pub total_output: f64,
    pub best_workouts: Vec<Workout>,
}

impl Database {
    /// Best workout per tournament ride for one rider
    ///
    /// Ranks a rider's workouts within each attached ride by `total_work`
    /// descending and keeps the top row. Ties go to the lowest workout id,
    /// so the first recorded effort wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn best_workouts_for_profile(
        &self,
        tournament_id: i64,
        profile_id: i64,
    ) -> Result<Vec<Workout>> {
        let rows = sqlx::query(
            r"
            SELECT id, peloton_id, ride_id, profile_id, status,
                   start_time, end_time, total_work, raw
            FROM (
                SELECT w.*, ROW_NUMBER() OVER (
                    PARTITION BY w.ride_id
                    ORDER BY w.total_work DESC, w.id ASC
                ) AS ride_rank
                FROM workouts w
                JOIN tournament_rides tr
                    ON tr.ride_id = w.ride_id AND tr.tournament_id = ?1
                WHERE w.profile_id = ?2
            )
            WHERE ride_rank = 1
            ORDER BY ride_id ASC
            ",
        )
        .bind(tournament_id)
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_workout).collect()
    }

    /// Best workout per (ride, rider) pair for one team
    ///
    /// Same ranking as [`Self::best_workouts_for_profile`] but partitioned
    /// by ride and rider together, restricted to workouts whose ride is
    /// attached to the tournament and whose rider belongs to the team.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn best_workouts_for_team(
        &self,
        tournament_id: i64,
        team_id: i64,
    ) -> Result<Vec<Workout>> {
        let rows = sqlx::query(
            r"
            SELECT id, peloton_id, ride_id, profile_id, status,
                   start_time, end_time, total_work, raw
            FROM (
                SELECT w.*, ROW_NUMBER() OVER (
                    PARTITION BY w.ride_id, w.profile_id
                    ORDER BY w.total_work DESC, w.id ASC
                ) AS ride_rank
                FROM workouts w
                JOIN tournament_rides tr
                    ON tr.ride_id = w.ride_id AND tr.tournament_id = ?1
                JOIN tournament_members m
                    ON m.profile_id = w.profile_id
                    AND m.tournament_id = ?1 AND m.team_id = ?2
            )
            WHERE ride_rank = 1
            ORDER BY ride_id ASC, profile_id ASC
            ",
        )
        .bind(tournament_id)
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_workout).collect()
    }

    /// Total output for one team
    ///
    /// Sums exactly one best `total_work` per (ride, rider) pair. A team
    /// with no qualifying workouts totals 0.0 rather than null.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn team_total_output(&self, tournament_id: i64, team_id: i64) -> Result<f64> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(total_work), 0.0) AS total_output
            FROM (
                SELECT w.total_work, ROW_NUMBER() OVER (
                    PARTITION BY w.ride_id, w.profile_id
                    ORDER BY w.total_work DESC, w.id ASC
                ) AS ride_rank
                FROM workouts w
                JOIN tournament_rides tr
                    ON tr.ride_id = w.ride_id AND tr.tournament_id = ?1
                JOIN tournament_members m
                    ON m.profile_id = w.profile_id
                    AND m.tournament_id = ?1 AND m.team_id = ?2
            )
            WHERE ride_rank = 1
            ",
        )
        .bind(tournament_id)
        .bind(team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("total_output")?)
    }

    /// Full leaderboard for a tournament, teams ranked by total output
    ///
    /// # Errors
    ///
    /// Returns an error if any underlying query fails
    pub async fn get_team_standings(&self, tournament_id: i64) -> Result<Vec<TeamStanding>> {
        let teams = self.get_tournament_teams(tournament_id).await?;
        let mut standings = Vec::with_capacity(teams.len());

        for team in teams {
            let best_workouts = self.best_workouts_for_team(tournament_id, team.id).await?;
            let total_output = self.team_total_output(tournament_id, team.id).await?;
            standings.push(TeamStanding {
                team,
                total_output,
                best_workouts,
            });
        }

        standings.sort_by(|a, b| {
            b.total_output
                .total_cmp(&a.total_output)
                .then(a.team.id.cmp(&b.team.id))
        });

        Ok(standings)
    }
}
