// ABOUTME: Wire-format structures for Peloton API JSON payloads
// ABOUTME: Typed views over the upstream responses, each keeping the verbatim payload
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! Typed views over Peloton API responses.
//!
//! The upstream payloads carry far more fields than the server uses; each
//! struct extracts what the domain needs and keeps the verbatim JSON in
//! `raw` so nothing is lost at rest.

use serde::{Deserialize, Serialize};

/// Body for `POST /auth/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    /// Username or email, upstream accepts either
    pub username_or_email: String,
    /// Plaintext password, only ever sent upstream
    pub password: String,
}

/// Response from `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Session id to present as a cookie on later calls
    pub session_id: String,
    /// Peloton user id of the authenticated rider
    pub user_id: String,
}

/// Response from `GET /auth/check_session`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSessionResponse {
    /// Whether the presented session id is still live
    #[serde(default)]
    pub is_valid: bool,
    /// The session's user, when valid
    #[serde(default)]
    pub user: Option<CheckSessionUser>,
}

/// User summary nested in the session check response
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSessionUser {
    /// Leaderboard username
    #[serde(default)]
    pub username: Option<String>,
}

/// Response from `GET /api/user/{id_or_username}` and `GET /api/me`
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    /// Peloton user id
    pub id: String,
    /// Leaderboard username
    pub username: String,
    /// Avatar URL
    #[serde(default)]
    pub image_url: Option<String>,
    /// Verbatim payload
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Response from `GET /api/instructor/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct InstructorResponse {
    /// Peloton instructor id
    pub id: String,
    /// Instructor name
    #[serde(default)]
    pub name: Option<String>,
    /// Portrait URL
    #[serde(default)]
    pub image_url: Option<String>,
    /// Verbatim payload
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Response from `GET /api/ride/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct RideResponse {
    /// Peloton ride id
    pub id: String,
    /// Class title
    #[serde(default)]
    pub title: Option<String>,
    /// Class description
    #[serde(default)]
    pub description: Option<String>,
    /// Poster image URL
    #[serde(default)]
    pub image_url: Option<String>,
    /// Original air time, epoch seconds
    #[serde(default)]
    pub scheduled_start_time: Option<i64>,
    /// Instructor id, when the class has one
    #[serde(default)]
    pub instructor_id: Option<String>,
    /// Verbatim payload
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Ride reference joined onto workout records
#[derive(Debug, Clone, Deserialize)]
pub struct RideRef {
    /// Peloton ride id
    pub id: String,
}

/// Response from `GET /api/workout/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct WorkoutResponse {
    /// Peloton workout id
    pub id: String,
    /// Peloton user id of the rider
    pub user_id: String,
    /// Upstream status string
    #[serde(default)]
    pub status: Option<String>,
    /// Total output in joules
    #[serde(default)]
    pub total_work: Option<f64>,
    /// Workout start, epoch seconds
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Workout end, epoch seconds
    #[serde(default)]
    pub end_time: Option<i64>,
    /// Joined ride reference
    #[serde(default)]
    pub ride: Option<RideRef>,
    /// Verbatim payload
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// One record from the paginated workout listing
///
/// Only the fields the window/ride filters need are extracted; the upsert
/// path re-fetches each kept workout by id for the full record.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkoutSummary {
    /// Peloton workout id
    pub id: String,
    /// Record creation time, epoch seconds; the listing is ordered by this,
    /// newest first
    pub created_at: i64,
    /// Joined ride reference (present with `joins=ride`)
    #[serde(default)]
    pub ride: Option<RideRef>,
    /// Verbatim payload
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Envelope for paginated `data` arrays
#[derive(Debug, Clone, Deserialize)]
pub struct PageEnvelope<T> {
    /// Records on this page
    #[serde(default)]
    pub data: Vec<T>,
}
