// ABOUTME: Team route handlers
// ABOUTME: Create and delete teams within a tournament
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::{authorize_admin, find_tournament, ServerResources, TeamView};
use crate::errors::{AppError, AppResult};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Body for `POST /tournaments/{id}/teams`
#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

/// `POST /tournaments/{id}/teams` - create a team
pub async fn create_team(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CreateTeamRequest>,
) -> AppResult<Response> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Team name must not be empty"));
    }

    let team = resources.database.create_team(tournament.id, name).await?;

    info!(
        tournament = %tournament.public_id,
        team = %team.public_id,
        "Created team"
    );

    Ok((StatusCode::CREATED, Json(TeamView::from_team(&team))).into_response())
}

/// `DELETE /tournaments/{id}/teams/{team_id}` - delete a team
///
/// Member rows survive with no team assignment.
pub async fn delete_team(
    State(resources): State<Arc<ServerResources>>,
    Path((id, team_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let team = resources
        .database
        .get_team_by_public_id(tournament.id, &team_id)
        .await?
        .ok_or_else(|| AppError::not_found("Team"))?;

    resources.database.delete_team(team.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
