// ABOUTME: HTTP route handlers and router assembly
// ABOUTME: Holds shared server state, auth helpers, and the response view structs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # HTTP Routes
//!
//! One module per resource, assembled into a single [`axum::Router`] here.
//! Handlers share [`ServerResources`] through axum state and return
//! `AppResult` so every failure renders through the standard error body.
//!
//! Access levels, checked per handler:
//! - **viewer**: anyone for public tournaments, any authenticated caller
//!   for private ones
//! - **authenticated**: a valid bearer token
//! - **admin**: an authenticated caller whose linked profile holds an
//!   owner or manager membership

pub mod members;
pub mod profile;
pub mod rides;
pub mod teams;
pub mod tournaments;

use crate::auth::{AuthManager, AuthResult};
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{Instructor, Membership, PelotonProfile, Ride, Team, Tournament, Workout};
use axum::http::{header, HeaderMap};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
pub struct ServerResources {
    /// Database connection pool
    pub database: Arc<Database>,
    /// Bearer token validation
    pub auth_manager: Arc<AuthManager>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Bundle the shared server state
    #[must_use]
    pub fn new(database: Database, auth_manager: AuthManager, config: ServerConfig) -> Self {
        Self {
            database: Arc::new(database),
            auth_manager: Arc::new(auth_manager),
            config: Arc::new(config),
        }
    }
}

/// Assemble the application router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/profile/link", post(profile::link_profile))
        .route("/profile", get(profile::get_profile))
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route(
            "/tournaments/:id",
            get(tournaments::get_tournament).put(tournaments::update_tournament),
        )
        .route(
            "/tournaments/:id/leaderboard",
            get(tournaments::get_leaderboard),
        )
        .route("/tournaments/:id/sync", post(tournaments::sync_tournament))
        .route(
            "/tournaments/:id/riders/search",
            get(members::search_riders),
        )
        .route("/tournaments/:id/riders", post(members::add_rider))
        .route(
            "/tournaments/:id/riders/:member_id",
            delete(members::remove_rider),
        )
        .route("/tournaments/:id/members/teams", put(members::assign_teams))
        .route("/tournaments/:id/members/roles", put(members::assign_roles))
        .route("/tournaments/:id/teams", post(teams::create_team))
        .route(
            "/tournaments/:id/teams/:team_id",
            delete(teams::delete_team),
        )
        .route(
            "/tournaments/:id/rides",
            get(rides::list_rides).post(rides::attach_ride),
        )
        .route("/tournaments/:id/rides/filters", get(rides::ride_filters))
        .route(
            "/tournaments/:id/rides/:ride_id",
            delete(rides::detach_ride),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(resources)
}

/// Liveness probe
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pelotourney",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Verify the bearer token and ensure a local account for its subject
pub(crate) async fn authenticate(
    resources: &ServerResources,
    headers: &HeaderMap,
) -> AppResult<AuthResult> {
    let token = bearer_token(headers)?;
    let claims = resources.auth_manager.validate_token(token)?;
    let user = resources.database.ensure_user(&claims.email, None).await?;
    Ok(AuthResult { user })
}

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(AppError::auth_required)?;

    value
        .strip_prefix("Bearer ")
        .ok_or_else(AppError::auth_required)
}

/// The caller's linked Peloton profile, required for membership-based actions
pub(crate) async fn require_linked_profile(
    resources: &ServerResources,
    auth: &AuthResult,
) -> AppResult<PelotonProfile> {
    resources
        .database
        .get_profile_by_user(auth.user.id)
        .await?
        .ok_or_else(|| AppError::forbidden("A linked Peloton profile is required"))
}

/// Resolve a tournament from its public id or 404
pub(crate) async fn find_tournament(
    resources: &ServerResources,
    public_id: &str,
) -> AppResult<Tournament> {
    resources
        .database
        .get_tournament_by_public_id(public_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tournament"))
}

/// Viewer access: public tournaments are open, private ones need a valid token
pub(crate) async fn authorize_viewer(
    resources: &ServerResources,
    headers: &HeaderMap,
    tournament: &Tournament,
) -> AppResult<()> {
    if tournament.visibility.is_public() {
        return Ok(());
    }
    authenticate(resources, headers).await?;
    Ok(())
}

/// Admin access: the caller's linked profile must hold an owner or manager
/// membership for this tournament
pub(crate) async fn authorize_admin(
    resources: &ServerResources,
    headers: &HeaderMap,
    tournament: &Tournament,
) -> AppResult<PelotonProfile> {
    let auth = authenticate(resources, headers).await?;
    let profile = require_linked_profile(resources, &auth).await?;

    if !resources
        .database
        .is_tournament_admin(tournament.id, profile.id)
        .await?
    {
        return Err(AppError::forbidden("Tournament admin role required"));
    }

    Ok(profile)
}

/// Team payload; teams are addressed by public id
#[derive(Debug, Serialize)]
pub struct TeamView {
    pub id: String,
    pub name: String,
}

impl TeamView {
    pub(crate) fn from_team(team: &Team) -> Self {
        Self {
            id: team.public_id.clone(),
            name: team.name.clone(),
        }
    }
}

/// Membership payload joined with its profile; team referenced by public id
#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: String,
    pub username: String,
    pub image_url: Option<String>,
    pub role: String,
    pub team_id: Option<String>,
}

impl MemberView {
    pub(crate) fn new(
        membership: &Membership,
        profile: &PelotonProfile,
        team_public_ids: &HashMap<i64, String>,
    ) -> Self {
        Self {
            id: membership.public_id.clone(),
            username: profile.username.clone(),
            image_url: profile.image_url.clone(),
            role: membership.role.as_str().to_owned(),
            team_id: membership
                .team_id
                .and_then(|team_id| team_public_ids.get(&team_id).cloned()),
        }
    }
}

/// Instructor summary nested in ride payloads
#[derive(Debug, Serialize)]
pub struct InstructorView {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

/// Ride payload; rides are addressed by their Peloton id
#[derive(Debug, Serialize)]
pub struct RideView {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub scheduled_start_time: Option<DateTime<Utc>>,
    pub instructor: Option<InstructorView>,
}

impl RideView {
    pub(crate) fn new(ride: &Ride, instructor: Option<&Instructor>) -> Self {
        Self {
            id: ride.peloton_id.clone(),
            title: ride.title.clone(),
            description: ride.description.clone(),
            image_url: ride.image_url.clone(),
            scheduled_start_time: ride.scheduled_start_time,
            instructor: instructor.map(|instructor| InstructorView {
                name: instructor.name.clone(),
                image_url: instructor.image_url.clone(),
            }),
        }
    }
}

/// Workout payload with derived metrics; references other entities by their
/// Peloton ids and usernames
#[derive(Debug, Serialize)]
pub struct WorkoutView {
    pub id: String,
    pub username: Option<String>,
    pub ride_id: Option<String>,
    pub status: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_work: Option<f64>,
    pub duration_seconds: i64,
    pub average_output: f64,
}

impl WorkoutView {
    pub(crate) fn new(
        workout: &Workout,
        usernames: &HashMap<i64, String>,
        ride_peloton_ids: &HashMap<i64, String>,
    ) -> Self {
        Self {
            id: workout.peloton_id.clone(),
            username: usernames.get(&workout.profile_id).cloned(),
            ride_id: workout
                .ride_id
                .and_then(|ride_id| ride_peloton_ids.get(&ride_id).cloned()),
            status: workout.status.clone(),
            start_time: workout.start_time,
            end_time: workout.end_time,
            total_work: workout.total_work,
            duration_seconds: workout.duration(),
            average_output: workout.average_output(),
        }
    }
}
