// ABOUTME: Tournament synchronization workflow against the Peloton API
// ABOUTME: Refreshes rides, participants, and windowed workouts, then stamps last_synced
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Tournament Synchronization
//!
//! Pulls a tournament's mirrored entities up to date in one pass: every
//! attached ride, every participant profile, and each participant's workouts
//! inside the tournament window. Rides finish before any participant starts,
//! so workout upserts always find their ride rows already current.

pub mod upsert;

pub use upsert::{from_peloton_id, PelotonSourced};

use crate::config::PelotonConfig;
use crate::database::Database;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{PelotonProfile, Tournament, Workout};
use crate::peloton::PelotonClient;
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

/// Synchronize one tournament from the Peloton API
///
/// The caller must hold an owner or manager membership. If the caller's
/// profile carries a sealed session id, the client presents it; a session
/// that no longer validates is ignored and the sync proceeds without
/// authentication.
///
/// The workout fetch window is `[start_date, end_date + grace]`, with the
/// grace hours taken from configuration. Only the fetch window stretches;
/// the stored tournament dates never change.
///
/// # Errors
///
/// `Forbidden` when the caller is not an admin; `ExternalApi` on any
/// upstream failure past the session check. Entities saved before a
/// failure stay saved.
pub async fn sync_tournament(
    db: &Database,
    peloton: &PelotonConfig,
    tournament: &mut Tournament,
    caller: &PelotonProfile,
) -> AppResult<()> {
    if !db.is_tournament_admin(tournament.id, caller.id).await? {
        return Err(AppError::forbidden(
            "Only tournament admins can run a sync",
        ));
    }

    info!(
        tournament = %tournament.public_id,
        caller = %caller.username,
        "Starting tournament sync"
    );

    let mut client = PelotonClient::new(peloton.base_url.clone());
    attach_caller_session(&mut client, db, caller).await?;

    let rides = db.get_tournament_rides(tournament.id).await?;
    for mut ride in rides {
        // Rides refresh unconditionally so upstream corrections land even
        // on finalized rows
        ride.update_from_api(db, &client).await?;
        ride.save(db).await?;
        debug!(ride = %ride.peloton_id, "Refreshed tournament ride");
    }

    let ride_ids = db.get_tournament_ride_peloton_ids(tournament.id).await?;
    let window_start = tournament.start_date;
    let window_end = tournament.end_date + Duration::hours(peloton.sync_end_grace_hours);

    let participants = db.get_tournament_participants(tournament.id).await?;
    let mut upserted = 0usize;

    for participant in participants {
        let profile = PelotonProfile::from_peloton_id_or_username(
            db,
            &client,
            participant.peloton_id.as_deref(),
            Some(&participant.username),
        )
        .await?;

        let Some(user_id) = profile.peloton_id.as_deref() else {
            warn!(username = %profile.username, "Participant has no Peloton id, skipping");
            continue;
        };

        let summaries = client
            .get_workouts(user_id, Some(window_start), Some(window_end), &ride_ids)
            .await?;

        debug!(
            username = %profile.username,
            count = summaries.len(),
            "Upserting windowed workouts"
        );

        for summary in summaries {
            from_peloton_id::<Workout>(db, &client, &summary.id).await?;
            upserted += 1;
        }
    }

    tournament.last_synced = Some(Utc::now());
    db.update_tournament(tournament).await?;

    info!(
        tournament = %tournament.public_id,
        workouts = upserted,
        "Tournament sync complete"
    );

    Ok(())
}

/// Present the caller's stored Peloton session, if one unseals and validates
///
/// A session Peloton no longer accepts downgrades to an unauthenticated
/// client; every other failure propagates.
async fn attach_caller_session(
    client: &mut PelotonClient,
    db: &Database,
    caller: &PelotonProfile,
) -> AppResult<()> {
    let Some(sealed) = &caller.session_token else {
        return Ok(());
    };

    let session_id = sealed.open(db.sealing_key())?;
    match client.load_session(&session_id).await {
        Ok(_) => {
            debug!(username = %caller.username, "Syncing with the caller's Peloton session");
            Ok(())
        }
        Err(err) if err.code == ErrorCode::SessionInvalid => {
            warn!(
                username = %caller.username,
                "Stored Peloton session no longer validates, syncing unauthenticated"
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}
