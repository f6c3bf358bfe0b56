// ABOUTME: Tournament route handlers
// ABOUTME: Listing buckets, create/detail/edit, leaderboard, and manual sync
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::{
    authenticate, authorize_admin, authorize_viewer, find_tournament, require_linked_profile,
    MemberView, ServerResources, TeamView, WorkoutView,
};
use crate::database::TournamentBuckets;
use crate::errors::{AppError, AppResult};
use crate::models::{MemberRole, Tournament, TournamentVisibility};
use crate::sync;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Tournament payload, addressed by public id
#[derive(Debug, Serialize)]
pub struct TournamentView {
    pub id: String,
    pub name: String,
    pub format: String,
    pub visibility: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub last_synced: Option<DateTime<Utc>>,
}

impl TournamentView {
    fn from_tournament(tournament: &Tournament) -> Self {
        Self {
            id: tournament.public_id.clone(),
            name: tournament.name.clone(),
            format: tournament.format.as_str().to_owned(),
            visibility: tournament.visibility.as_str().to_owned(),
            start_date: tournament.start_date,
            end_date: tournament.end_date,
            last_synced: tournament.last_synced,
        }
    }
}

/// Response for `GET /tournaments`
#[derive(Debug, Serialize)]
pub struct TournamentListResponse {
    pub upcoming: Vec<TournamentView>,
    pub active: Vec<TournamentView>,
    pub recent: Vec<TournamentView>,
}

/// Response for `GET /tournaments/{id}`
#[derive(Debug, Serialize)]
pub struct TournamentDetailResponse {
    pub tournament: TournamentView,
    pub teams: Vec<TeamView>,
    pub members: Vec<MemberView>,
}

/// One team row on the leaderboard response
#[derive(Debug, Serialize)]
pub struct StandingView {
    pub team: TeamView,
    pub total_output: f64,
    pub best_workouts: Vec<WorkoutView>,
}

/// Response for `GET /tournaments/{id}/leaderboard`
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub tournament: TournamentView,
    pub standings: Vec<StandingView>,
}

/// Body for `POST /tournaments`
#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    #[serde(default)]
    pub visibility: Option<String>,
    /// Day the tournament opens, `YYYY-MM-DD`
    pub start_date: String,
    /// Last day of the tournament, `YYYY-MM-DD`
    pub end_date: String,
}

/// Body for `PUT /tournaments/{id}`; absent fields keep their value
#[derive(Debug, Deserialize)]
pub struct UpdateTournamentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// `GET /tournaments` - the caller's tournaments in time buckets
pub async fn list_tournaments(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> AppResult<Json<TournamentListResponse>> {
    let auth = authenticate(&resources, &headers).await?;

    // A caller without a linked profile has no memberships yet
    let buckets = match resources.database.get_profile_by_user(auth.user.id).await? {
        Some(profile) => {
            resources
                .database
                .get_tournament_buckets(profile.id, Utc::now())
                .await?
        }
        None => TournamentBuckets::default(),
    };

    Ok(Json(TournamentListResponse {
        upcoming: views(&buckets.upcoming),
        active: views(&buckets.active),
        recent: views(&buckets.recent),
    }))
}

/// `POST /tournaments` - create a tournament, creator becomes owner
pub async fn create_tournament(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<CreateTournamentRequest>,
) -> AppResult<Response> {
    let auth = authenticate(&resources, &headers).await?;
    let profile = require_linked_profile(&resources, &auth).await?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Tournament name must not be empty"));
    }

    let visibility = match request.visibility.as_deref() {
        Some(value) => TournamentVisibility::parse(value)?,
        None => TournamentVisibility::default(),
    };
    let start_date = parse_day_start(&request.start_date)?;
    let end_date = parse_day_end(&request.end_date)?;

    let tournament = resources
        .database
        .create_tournament(name, visibility, start_date, end_date)
        .await?;
    resources
        .database
        .add_member(tournament.id, profile.id, MemberRole::Owner)
        .await?;

    info!(
        tournament = %tournament.public_id,
        owner = %profile.username,
        "Created tournament"
    );

    Ok((
        StatusCode::CREATED,
        Json(TournamentView::from_tournament(&tournament)),
    )
        .into_response())
}

/// `GET /tournaments/{id}` - tournament with its teams and members
pub async fn get_tournament(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<TournamentDetailResponse>> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_viewer(&resources, &headers, &tournament).await?;

    let teams = resources.database.get_tournament_teams(tournament.id).await?;
    let team_public_ids: HashMap<i64, String> = teams
        .iter()
        .map(|team| (team.id, team.public_id.clone()))
        .collect();
    let members = resources
        .database
        .get_memberships_with_profiles(tournament.id)
        .await?;

    Ok(Json(TournamentDetailResponse {
        tournament: TournamentView::from_tournament(&tournament),
        teams: teams.iter().map(TeamView::from_team).collect(),
        members: members
            .iter()
            .map(|(membership, profile)| MemberView::new(membership, profile, &team_public_ids))
            .collect(),
    }))
}

/// `PUT /tournaments/{id}` - update name, dates, or visibility
pub async fn update_tournament(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateTournamentRequest>,
) -> AppResult<StatusCode> {
    let mut tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    if let Some(name) = &request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Tournament name must not be empty"));
        }
        tournament.name = name.to_owned();
    }
    if let Some(visibility) = request.visibility.as_deref() {
        tournament.visibility = TournamentVisibility::parse(visibility)?;
    }
    if let Some(start_date) = request.start_date.as_deref() {
        tournament.start_date = parse_day_start(start_date)?;
    }
    if let Some(end_date) = request.end_date.as_deref() {
        tournament.end_date = parse_day_end(end_date)?;
    }

    resources.database.update_tournament(&tournament).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /tournaments/{id}/leaderboard` - teams ranked by total output
pub async fn get_leaderboard(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<LeaderboardResponse>> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_viewer(&resources, &headers, &tournament).await?;

    let standings = resources.database.get_team_standings(tournament.id).await?;

    let members = resources
        .database
        .get_memberships_with_profiles(tournament.id)
        .await?;
    let usernames: HashMap<i64, String> = members
        .iter()
        .map(|(_, profile)| (profile.id, profile.username.clone()))
        .collect();
    let rides = resources.database.get_tournament_rides(tournament.id).await?;
    let ride_peloton_ids: HashMap<i64, String> = rides
        .iter()
        .map(|ride| (ride.id, ride.peloton_id.clone()))
        .collect();

    Ok(Json(LeaderboardResponse {
        tournament: TournamentView::from_tournament(&tournament),
        standings: standings
            .into_iter()
            .map(|standing| StandingView {
                team: TeamView::from_team(&standing.team),
                total_output: standing.total_output,
                best_workouts: standing
                    .best_workouts
                    .iter()
                    .map(|workout| WorkoutView::new(workout, &usernames, &ride_peloton_ids))
                    .collect(),
            })
            .collect(),
    }))
}

/// `POST /tournaments/{id}/sync` - pull rides, riders, and workouts from
/// Peloton
pub async fn sync_tournament(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let mut tournament = find_tournament(&resources, &id).await?;
    let auth = authenticate(&resources, &headers).await?;
    let profile = require_linked_profile(&resources, &auth).await?;

    sync::sync_tournament(
        &resources.database,
        &resources.config.peloton,
        &mut tournament,
        &profile,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn views(tournaments: &[Tournament]) -> Vec<TournamentView> {
    tournaments
        .iter()
        .map(TournamentView::from_tournament)
        .collect()
}

/// Parse `YYYY-MM-DD` as the first instant of that day, UTC
fn parse_day_start(value: &str) -> AppResult<DateTime<Utc>> {
    let day = parse_day(value)?;
    Ok(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
}

/// Parse `YYYY-MM-DD` as the last millisecond of that day, UTC
fn parse_day_end(value: &str) -> AppResult<DateTime<Utc>> {
    let day = parse_day(value)?;
    let start_of_day = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    Ok(start_of_day + Duration::days(1) - Duration::milliseconds(1))
}

fn parse_day(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date (expected YYYY-MM-DD): {value}")))
}
