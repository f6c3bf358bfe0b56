// ABOUTME: Rider and membership route handlers
// ABOUTME: Upstream rider search, add/remove riders, bulk team and role changes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::{authorize_admin, find_tournament, MemberView, ServerResources};
use crate::errors::{AppError, AppResult};
use crate::models::{MemberRole, PelotonProfile};
use crate::peloton::PelotonClient;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Query string for `GET /tournaments/{id}/riders/search`
#[derive(Debug, Deserialize)]
pub struct RiderSearchParams {
    #[serde(default)]
    pub rider_query: String,
}

/// Body for `POST /tournaments/{id}/riders`
#[derive(Debug, Deserialize)]
pub struct AddRiderRequest {
    pub username: String,
}

/// One group in the `PUT /tournaments/{id}/members/teams` body; a null
/// `team_id` moves the riders to unassigned
#[derive(Debug, Deserialize)]
pub struct TeamAssignment {
    pub team_id: Option<String>,
    pub usernames: Vec<String>,
}

/// One entry in the `PUT /tournaments/{id}/members/roles` body
#[derive(Debug, Deserialize)]
pub struct RoleAssignment {
    pub member_id: String,
    pub role: String,
}

/// `GET /tournaments/{id}/riders/search` - proxy the upstream rider search
pub async fn search_riders(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<RiderSearchParams>,
) -> AppResult<Json<Value>> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let client = PelotonClient::new(resources.config.peloton.base_url.clone());
    let results = client.search_users(&params.rider_query).await?;

    Ok(Json(json!({ "data": results })))
}

/// `POST /tournaments/{id}/riders` - add a rider by username
///
/// An unknown username gets a bare profile row; the next sync fills it in.
pub async fn add_rider(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AddRiderRequest>,
) -> AppResult<Response> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::validation("Username must not be empty"));
    }

    let profile = match resources.database.get_profile_by_username(username).await? {
        Some(profile) => profile,
        None => {
            let mut profile = PelotonProfile {
                id: 0,
                peloton_id: None,
                username: username.to_owned(),
                image_url: None,
                user_id: None,
                session_token: None,
                last_linked: None,
                raw: None,
            };
            resources.database.insert_profile(&mut profile).await?;
            profile
        }
    };

    if resources
        .database
        .get_membership_for_profile(tournament.id, profile.id)
        .await?
        .is_some()
    {
        return Err(AppError::validation(format!(
            "{username} is already in this tournament"
        )));
    }

    let membership = resources
        .database
        .add_member(tournament.id, profile.id, MemberRole::Member)
        .await?;

    info!(
        tournament = %tournament.public_id,
        username = %profile.username,
        "Added rider"
    );

    Ok((
        StatusCode::CREATED,
        Json(MemberView::new(&membership, &profile, &HashMap::new())),
    )
        .into_response())
}

/// `DELETE /tournaments/{id}/riders/{member_id}` - remove a membership
pub async fn remove_rider(
    State(resources): State<Arc<ServerResources>>,
    Path((id, member_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let membership = resources
        .database
        .get_membership_by_public_id(tournament.id, &member_id)
        .await?
        .ok_or_else(|| AppError::not_found("Membership"))?;

    resources.database.delete_membership(membership.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /tournaments/{id}/members/teams` - bulk team reassignment
pub async fn assign_teams(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(assignments): Json<Vec<TeamAssignment>>,
) -> AppResult<StatusCode> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    for group in &assignments {
        let team_row_id = match group.team_id.as_deref() {
            Some(team_public_id) => Some(
                resources
                    .database
                    .get_team_by_public_id(tournament.id, team_public_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Team"))?
                    .id,
            ),
            None => None,
        };

        for username in &group.usernames {
            let profile = resources
                .database
                .get_profile_by_username(username)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Rider {username}")))?;
            let membership = resources
                .database
                .get_membership_for_profile(tournament.id, profile.id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Membership for {username}")))?;

            resources
                .database
                .set_membership_team(membership.id, team_row_id)
                .await?;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /tournaments/{id}/members/roles` - bulk role changes
pub async fn assign_roles(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(assignments): Json<Vec<RoleAssignment>>,
) -> AppResult<StatusCode> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    for assignment in &assignments {
        let membership = resources
            .database
            .get_membership_by_public_id(tournament.id, &assignment.member_id)
            .await?
            .ok_or_else(|| AppError::not_found("Membership"))?;
        let role = MemberRole::parse(&assignment.role)?;

        resources
            .database
            .set_membership_role(membership.id, role)
            .await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
