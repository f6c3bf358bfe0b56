// ABOUTME: HTTP client for the Peloton API with session-cookie authentication
// ABOUTME: Covers login, session checks, entity lookups, user search, and workout paging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Peloton API client
//!
//! A thin wrapper over `reqwest` that speaks the subset of the Peloton API
//! the server needs. Authentication is a session id presented as the
//! `peloton_session_id` cookie; unauthenticated calls work for public
//! records. The workout listing is reverse-chronological upstream, and the
//! paging logic here depends on that ordering.

/// Wire-format structures for the Peloton JSON payloads
pub mod types;

use chrono::{DateTime, Utc};
use reqwest::header::COOKIE;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use types::{
    CheckSessionResponse, InstructorResponse, LoginRequest, LoginResponse, PageEnvelope,
    RideResponse, UserResponse, WorkoutResponse, WorkoutSummary,
};

/// Client for the Peloton API
///
/// Holds the session id in plain form for the lifetime of the client only;
/// at rest the id is sealed (see `SealedSessionToken`).
pub struct PelotonClient {
    client: Client,
    base_url: String,
    session_id: Option<String>,
}

impl PelotonClient {
    /// Cookie carrying the session id
    pub const SESSION_COOKIE: &'static str = "peloton_session_id";
    /// Records per page of the workout listing
    pub const WORKOUT_PAGE_SIZE: usize = 20;
    /// Records returned by user search
    pub const USER_SEARCH_PAGE_SIZE: usize = 40;

    /// Create an unauthenticated client against the given base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
            session_id: None,
        }
    }

    /// The session id currently attached to requests, if any
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Authenticate with Peloton credentials
    ///
    /// On success, later calls from this client carry the session cookie.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` when upstream rejects the login; `ExternalApi`
    /// for transport failures or malformed responses
    pub async fn login(
        &mut self,
        username_or_email: &str,
        password: &str,
    ) -> AppResult<LoginResponse> {
        info!(username = %username_or_email, "Logging into Peloton API");

        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                username_or_email: username_or_email.to_owned(),
                password: password.to_owned(),
            })
            .send()
            .await
            .map_err(|e| AppError::external_api(format!("Peloton login request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::invalid_credentials());
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_api(format!("Malformed login response: {e}")))?;

        self.session_id = Some(login.session_id.clone());
        Ok(login)
    }

    /// Validate a stored session id and attach it to this client
    ///
    /// # Errors
    ///
    /// `SessionInvalid` when upstream answers with an error status or
    /// `is_valid: false`; `ExternalApi` for transport failures
    pub async fn load_session(&mut self, session_id: &str) -> AppResult<CheckSessionResponse> {
        let response = self
            .client
            .get(self.url("/auth/check_session"))
            .header(
                COOKIE,
                format!("{}={}", Self::SESSION_COOKIE, session_id),
            )
            .send()
            .await
            .map_err(|e| {
                AppError::external_api(format!("Peloton session check failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(AppError::session_invalid(
                "Peloton session is no longer valid",
            ));
        }

        let check: CheckSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_api(format!("Malformed session response: {e}")))?;

        if !check.is_valid {
            return Err(AppError::session_invalid(
                "Peloton session is no longer valid",
            ));
        }

        self.session_id = Some(session_id.to_owned());
        Ok(check)
    }

    async fn get_value(&self, path: &str, query: &[(&str, String)]) -> AppResult<Value> {
        let mut request = self.client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(session_id) = &self.session_id {
            request = request.header(
                COOKIE,
                format!("{}={}", Self::SESSION_COOKIE, session_id),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::external_api(format!("Peloton request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_api(format!(
                "Peloton API returned {status} for {path}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::external_api(format!("Malformed response for {path}: {e}")))
    }

    /// Fetch the authenticated rider's own record
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn get_me(&self) -> AppResult<UserResponse> {
        let raw = self.get_value("/api/me", &[]).await?;
        let mut user: UserResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::external_api(format!("Malformed user payload: {e}")))?;
        user.raw = raw;
        Ok(user)
    }

    /// Fetch a rider by Peloton id or leaderboard username
    ///
    /// Upstream resolves either form through the same endpoint.
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn get_user(&self, id_or_username: &str) -> AppResult<UserResponse> {
        let raw = self
            .get_value(&format!("/api/user/{id_or_username}"), &[])
            .await?;
        let mut user: UserResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::external_api(format!("Malformed user payload: {e}")))?;
        user.raw = raw;
        Ok(user)
    }

    /// Fetch an instructor by Peloton id
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn get_instructor(&self, peloton_id: &str) -> AppResult<InstructorResponse> {
        let raw = self
            .get_value(&format!("/api/instructor/{peloton_id}"), &[])
            .await?;
        let mut instructor: InstructorResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::external_api(format!("Malformed instructor payload: {e}")))?;
        instructor.raw = raw;
        Ok(instructor)
    }

    /// Fetch a ride by Peloton id
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn get_ride(&self, peloton_id: &str) -> AppResult<RideResponse> {
        let raw = self
            .get_value(&format!("/api/ride/{peloton_id}"), &[])
            .await?;
        let mut ride: RideResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::external_api(format!("Malformed ride payload: {e}")))?;
        ride.raw = raw;
        Ok(ride)
    }

    /// Fetch a workout by Peloton id
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn get_workout(&self, peloton_id: &str) -> AppResult<WorkoutResponse> {
        let raw = self
            .get_value(&format!("/api/workout/{peloton_id}"), &[])
            .await?;
        let mut workout: WorkoutResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::external_api(format!("Malformed workout payload: {e}")))?;
        workout.raw = raw;
        Ok(workout)
    }

    /// Fetch the upstream ride-filter metadata, echoed verbatim to clients
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn get_ride_filters(&self) -> AppResult<Value> {
        self.get_value("/api/ride/filters", &[]).await
    }

    /// Search riders by name fragment, echoed verbatim to clients
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn search_users(&self, user_query: &str) -> AppResult<Vec<Value>> {
        let raw = self
            .get_value(
                "/api/user/search",
                &[
                    ("user_query", user_query.to_owned()),
                    ("limit", Self::USER_SEARCH_PAGE_SIZE.to_string()),
                ],
            )
            .await?;
        let envelope: PageEnvelope<Value> = serde_json::from_value(raw)
            .map_err(|e| AppError::external_api(format!("Malformed search payload: {e}")))?;
        Ok(envelope.data)
    }

    /// Fetch a rider's workouts, filtered to a time window and ride set
    ///
    /// Pages through `/api/user/{id}/workouts` (newest first, `joins=ride`)
    /// and keeps records whose `created_at` falls inside `[start, end]` and
    /// whose ride is in `ride_ids` (when non-empty). Fetches the next page
    /// only while a start bound exists and the oldest record on the current
    /// page is still newer than it.
    ///
    /// # Errors
    ///
    /// `ExternalApi` on transport or upstream errors
    pub async fn get_workouts(
        &self,
        user_id: &str,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        ride_ids: &[String],
    ) -> AppResult<Vec<WorkoutSummary>> {
        let mut page = 0usize;
        let mut workouts = Vec::new();

        loop {
            info!(user_id = %user_id, page, "Fetching page of workouts");
            let raw = self
                .get_value(
                    &format!("/api/user/{user_id}/workouts"),
                    &[
                        ("limit", Self::WORKOUT_PAGE_SIZE.to_string()),
                        ("page", page.to_string()),
                        ("joins", "ride".to_owned()),
                    ],
                )
                .await?;

            let envelope: PageEnvelope<Value> = serde_json::from_value(raw)
                .map_err(|e| AppError::external_api(format!("Malformed workout page: {e}")))?;

            let mut records = Vec::with_capacity(envelope.data.len());
            for value in envelope.data {
                let mut summary: WorkoutSummary = serde_json::from_value(value.clone())
                    .map_err(|e| {
                        AppError::external_api(format!("Malformed workout record: {e}"))
                    })?;
                summary.raw = value;
                records.push(summary);
            }

            workouts.extend(
                records
                    .iter()
                    .filter(|record| keep_record(record, start_date, end_date, ride_ids))
                    .cloned(),
            );

            if has_older_pages(&records, start_date) {
                debug!(page, "Oldest record still inside the window, next page");
                page += 1;
            } else {
                break;
            }
        }

        Ok(workouts)
    }
}

/// Whether a listing record survives the window and ride filters
fn keep_record(
    record: &WorkoutSummary,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    ride_ids: &[String],
) -> bool {
    if let Some(start) = start_date {
        if record.created_at < start.timestamp() {
            return false;
        }
    }
    if let Some(end) = end_date {
        if record.created_at > end.timestamp() {
            return false;
        }
    }
    if !ride_ids.is_empty() {
        let matches = record
            .ride
            .as_ref()
            .is_some_and(|ride| ride_ids.contains(&ride.id));
        if !matches {
            return false;
        }
    }
    true
}

/// Whether an older page may still hold in-window records
///
/// Only meaningful when a start bound exists: the listing is newest-first,
/// so paging continues while the oldest record on this page is newer than
/// the start. An empty page always stops.
fn has_older_pages(page: &[WorkoutSummary], start_date: Option<DateTime<Utc>>) -> bool {
    match (start_date, page.last()) {
        (Some(start), Some(oldest)) => oldest.created_at > start.timestamp(),
        _ => false,
    }
}
