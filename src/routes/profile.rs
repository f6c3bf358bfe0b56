// ABOUTME: Peloton profile linking route handlers
// ABOUTME: Credential login storing a sealed session, and link status lookup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

use super::{authenticate, ServerResources};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{PelotonProfile, SealedSessionToken};
use crate::peloton::PelotonClient;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Body for `POST /profile/link`
#[derive(Debug, Deserialize)]
pub struct LinkProfileRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Linked profile payload
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub peloton_id: Option<String>,
    pub image_url: Option<String>,
    pub last_linked: Option<DateTime<Utc>>,
    /// Whether the stored Peloton session still validates upstream
    pub session_valid: bool,
}

impl ProfileView {
    fn new(profile: &PelotonProfile, session_valid: bool) -> Self {
        Self {
            username: profile.username.clone(),
            peloton_id: profile.peloton_id.clone(),
            image_url: profile.image_url.clone(),
            last_linked: profile.last_linked,
            session_valid,
        }
    }
}

/// `POST /profile/link` - log into Peloton and link the profile
///
/// The password goes to Peloton and nowhere else; only the sealed session id
/// is stored. Bad credentials surface as a 401 the client can show.
pub async fn link_profile(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<LinkProfileRequest>,
) -> AppResult<Response> {
    let auth = authenticate(&resources, &headers).await?;

    let mut client = PelotonClient::new(resources.config.peloton.base_url.clone());
    let login = client.login(&request.username_or_email, &request.password).await?;
    let me = client.get_me().await?;

    let mut profile = match resources
        .database
        .get_profile_by_peloton_id_or_username(Some(&login.user_id), Some(&me.username))
        .await?
    {
        Some(profile) => profile,
        None => PelotonProfile {
            id: 0,
            peloton_id: None,
            username: String::new(),
            image_url: None,
            user_id: None,
            session_token: None,
            last_linked: None,
            raw: None,
        },
    };

    if profile
        .user_id
        .is_some_and(|linked| linked != auth.user.id)
    {
        return Err(AppError::validation(
            "This Peloton profile is already linked to another account",
        ));
    }
    if let Some(existing) = resources
        .database
        .get_profile_by_user(auth.user.id)
        .await?
    {
        if existing.id != profile.id {
            return Err(AppError::validation(
                "Your account is already linked to a different Peloton profile",
            ));
        }
    }

    profile.peloton_id = Some(login.user_id);
    profile.username = me.username;
    profile.image_url = me.image_url;
    profile.user_id = Some(auth.user.id);
    profile.session_token = Some(SealedSessionToken::seal(
        &login.session_id,
        resources.database.sealing_key(),
    )?);
    profile.last_linked = Some(Utc::now());
    profile.raw = Some(me.raw);

    if profile.id == 0 {
        resources.database.insert_profile(&mut profile).await?;
    } else {
        resources.database.update_profile(&profile).await?;
    }

    info!(username = %profile.username, "Linked Peloton profile");

    Ok((
        StatusCode::CREATED,
        Json(ProfileView::new(&profile, true)),
    )
        .into_response())
}

/// `GET /profile` - the caller's linked profile and session status
pub async fn get_profile(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> AppResult<Json<ProfileView>> {
    let auth = authenticate(&resources, &headers).await?;

    let profile = resources
        .database
        .get_profile_by_user(auth.user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Linked profile"))?;

    let session_valid = match &profile.session_token {
        Some(sealed) => {
            let session_id = sealed.open(resources.database.sealing_key())?;
            let mut client = PelotonClient::new(resources.config.peloton.base_url.clone());
            match client.load_session(&session_id).await {
                Ok(_) => true,
                Err(err) if err.code == ErrorCode::SessionInvalid => false,
                Err(err) => return Err(err),
            }
        }
        None => false,
    };

    Ok(Json(ProfileView::new(&profile, session_valid)))
}
