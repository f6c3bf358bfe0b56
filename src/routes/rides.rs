// ABOUTME: Tournament ride route handlers
// ABOUTME: Browse attached rides, attach/detach by Peloton id, upstream filter metadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::{authorize_admin, authorize_viewer, find_tournament, RideView, ServerResources};
use crate::errors::{AppError, AppResult};
use crate::models::Ride;
use crate::peloton::PelotonClient;
use crate::sync::from_peloton_id;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Response for `GET /tournaments/{id}/rides`
#[derive(Debug, Serialize)]
pub struct RideListResponse {
    pub rides: Vec<RideView>,
}

/// Body for `POST /tournaments/{id}/rides`
#[derive(Debug, Deserialize)]
pub struct AttachRideRequest {
    /// Peloton ride id
    pub ride_id: String,
}

/// `GET /tournaments/{id}/rides` - attached rides with instructor info
pub async fn list_rides(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<RideListResponse>> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_viewer(&resources, &headers, &tournament).await?;

    let rides = resources
        .database
        .get_tournament_rides_with_instructors(tournament.id)
        .await?;

    Ok(Json(RideListResponse {
        rides: rides
            .iter()
            .map(|(ride, instructor)| RideView::new(ride, instructor.as_ref()))
            .collect(),
    }))
}

/// `GET /tournaments/{id}/rides/filters` - echo upstream ride-filter metadata
pub async fn ride_filters(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let client = PelotonClient::new(resources.config.peloton.base_url.clone());
    let filters = client.get_ride_filters().await?;

    Ok(Json(filters))
}

/// `POST /tournaments/{id}/rides` - attach a ride by Peloton id
///
/// The ride's metadata (and its instructor) upserts on the way in.
pub async fn attach_ride(
    State(resources): State<Arc<ServerResources>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AttachRideRequest>,
) -> AppResult<Response> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let ride_id = request.ride_id.trim();
    if ride_id.is_empty() {
        return Err(AppError::validation("Ride id must not be empty"));
    }

    let client = PelotonClient::new(resources.config.peloton.base_url.clone());
    let ride = from_peloton_id::<Ride>(&resources.database, &client, ride_id).await?;
    resources
        .database
        .attach_ride(tournament.id, ride.id)
        .await?;

    let instructor = match ride.instructor_id {
        Some(instructor_id) => resources.database.get_instructor(instructor_id).await?,
        None => None,
    };

    info!(
        tournament = %tournament.public_id,
        ride = %ride.peloton_id,
        "Attached ride"
    );

    Ok((
        StatusCode::CREATED,
        Json(RideView::new(&ride, instructor.as_ref())),
    )
        .into_response())
}

/// `DELETE /tournaments/{id}/rides/{ride_id}` - detach a ride by Peloton id
pub async fn detach_ride(
    State(resources): State<Arc<ServerResources>>,
    Path((id, ride_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let tournament = find_tournament(&resources, &id).await?;
    authorize_admin(&resources, &headers, &tournament).await?;

    let detached = resources
        .database
        .detach_ride(tournament.id, &ride_id)
        .await?;
    if !detached {
        return Err(AppError::not_found("Ride"));
    }

    Ok(StatusCode::NO_CONTENT)
}
