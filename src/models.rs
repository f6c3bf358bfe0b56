// ABOUTME: Core data models and types for the Pelotourney tournament service
// ABOUTME: Defines User, PelotonProfile, Ride, Workout, Tournament and related structures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Data Models
//!
//! This module contains the core data structures used throughout the
//! Pelotourney server. Peloton-sourced entities (profiles, instructors,
//! rides, workouts) mirror upstream records and keep the raw payload
//! alongside the extracted columns; tournament entities are local.
//!
//! ## Core Models
//!
//! - `User`: local account tied to a verified bearer-token subject
//! - `PelotonProfile`: a Peloton rider, optionally linked to a local user
//! - `Instructor` / `Ride` / `Workout`: cached upstream records
//! - `Tournament` / `Team` / `Membership`: competition structure

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Represents a local user account
///
/// Accounts are created lazily the first time a verified bearer token
/// subject is seen; the identity provider itself lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address (used for identification)
    pub email: String,
    /// Display name
    pub display_name: Option<String>,
    /// When the user account was created
    pub created_at: DateTime<Utc>,
    /// Last time the user accessed the system
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Create a new user with the given email
    #[must_use]
    pub fn new(email: String, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            display_name,
            created_at: now,
            last_active: now,
        }
    }
}

/// A Peloton rider known to the system
///
/// Profiles can exist with only a username: tournament organizers add
/// riders by name before those riders ever authenticate. `peloton_id`,
/// `image_url`, and the rest fill in once the record is fetched upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PelotonProfile {
    /// Database row id
    pub id: i64,
    /// Upstream Peloton user id, once known
    pub peloton_id: Option<String>,
    /// Peloton leaderboard username
    pub username: String,
    /// Avatar URL, once fetched
    pub image_url: Option<String>,
    /// Local account this profile is linked to, if any
    pub user_id: Option<Uuid>,
    /// Sealed Peloton session id for authenticated API calls
    pub session_token: Option<SealedSessionToken>,
    /// When credentials were last linked
    pub last_linked: Option<DateTime<Utc>>,
    /// Verbatim upstream payload
    pub raw: Option<serde_json::Value>,
}

impl PelotonProfile {
    /// A profile is complete once its avatar has been resolved upstream
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.image_url.is_some()
    }
}

/// A Peloton instructor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    /// Database row id
    pub id: i64,
    /// Upstream Peloton instructor id
    pub peloton_id: String,
    /// Instructor name, once fetched
    pub name: Option<String>,
    /// Portrait URL
    pub image_url: Option<String>,
    /// Verbatim upstream payload
    pub raw: Option<serde_json::Value>,
}

impl Instructor {
    /// An instructor is complete once the name has been resolved
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.name.is_some()
    }
}

/// A Peloton class (ride)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    /// Database row id
    pub id: i64,
    /// Upstream Peloton ride id
    pub peloton_id: String,
    /// Class title, once fetched
    pub title: Option<String>,
    /// Class description
    pub description: Option<String>,
    /// Poster image URL
    pub image_url: Option<String>,
    /// Original air time of the class
    pub scheduled_start_time: Option<DateTime<Utc>>,
    /// Instructor row id, once resolved
    pub instructor_id: Option<i64>,
    /// Verbatim upstream payload
    pub raw: Option<serde_json::Value>,
}

impl Ride {
    /// A ride is complete once the title has been resolved
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.title.is_some()
    }
}

/// A rider's recorded attempt at a ride
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    /// Database row id
    pub id: i64,
    /// Upstream Peloton workout id
    pub peloton_id: String,
    /// Ride this workout was taken against, once resolved
    pub ride_id: Option<i64>,
    /// Profile that performed the workout
    pub profile_id: i64,
    /// Upstream status string ("COMPLETED", "IN_PROGRESS", ...)
    pub status: Option<String>,
    /// Workout start, UTC
    pub start_time: Option<DateTime<Utc>>,
    /// Workout end, UTC
    pub end_time: Option<DateTime<Utc>>,
    /// Total output in joules
    pub total_work: Option<f64>,
    /// Verbatim upstream payload
    pub raw: Option<serde_json::Value>,
}

impl Workout {
    /// Upstream status value marking a finished workout
    pub const STATUS_COMPLETE: &'static str = "COMPLETED";

    /// A workout is complete once upstream reports it finished
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status.as_deref() == Some(Self::STATUS_COMPLETE)
    }

    /// Elapsed seconds between start and end
    ///
    /// Zero when either endpoint is missing or the end precedes the start;
    /// always derived from the stored timestamps, never trusted upstream.
    #[must_use]
    pub fn duration(&self) -> i64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end >= start => (end - start).num_seconds(),
            _ => 0,
        }
    }

    /// Average output in watts (joules per second)
    ///
    /// Zero when the duration is zero or total work is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Safe: workout durations are far below 2^52 seconds
    pub fn average_output(&self) -> f64 {
        let duration = self.duration();
        if duration <= 0 {
            return 0.0;
        }
        self.total_work
            .map_or(0.0, |work| work / duration as f64)
    }
}

/// Tournament scoring format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TournamentFormat {
    /// Best output per (ride, rider), summed per team
    #[default]
    Simple,
}

impl TournamentFormat {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::Simple => "simple",
        }
    }

    /// Parse an upstream-facing format string
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown formats
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "simple" => Ok(TournamentFormat::Simple),
            other => Err(AppError::validation(format!(
                "Unknown tournament format: {other}"
            ))),
        }
    }
}

impl Display for TournamentFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Who may view a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TournamentVisibility {
    /// Anyone, authenticated or not
    Public,
    /// Authenticated callers only
    #[default]
    Private,
}

impl TournamentVisibility {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TournamentVisibility::Public => "public",
            TournamentVisibility::Private => "private",
        }
    }

    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(self, TournamentVisibility::Public)
    }

    /// Parse a visibility string
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown values
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "public" => Ok(TournamentVisibility::Public),
            "private" => Ok(TournamentVisibility::Private),
            other => Err(AppError::validation(format!(
                "Unknown visibility: {other}"
            ))),
        }
    }
}

impl Display for TournamentVisibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A time-boxed competition over a set of rides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    /// Database row id
    pub id: i64,
    /// Opaque identifier used in URLs and payloads
    pub public_id: String,
    /// Display name
    pub name: String,
    /// Scoring format
    pub format: TournamentFormat,
    /// Visibility for unauthenticated viewers
    pub visibility: TournamentVisibility,
    /// First instant of the competition window, UTC
    pub start_date: DateTime<Utc>,
    /// Last instant of the competition window, UTC
    pub end_date: DateTime<Utc>,
    /// When a sync last completed
    pub last_synced: Option<DateTime<Utc>>,
}

/// A named team inside a tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Database row id
    pub id: i64,
    /// Opaque identifier used in URLs and payloads
    pub public_id: String,
    /// Display name
    pub name: String,
    /// Owning tournament row id
    pub tournament_id: i64,
}

/// Privilege level of a tournament membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Creator; full control
    Owner,
    /// Delegated administration
    Manager,
    /// Competes, no administration
    #[default]
    Member,
}

impl MemberRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Manager => "manager",
            MemberRole::Member => "member",
        }
    }

    /// Whether this role can administer the tournament
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Manager)
    }

    /// Parse a role string
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown roles
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "owner" => Ok(MemberRole::Owner),
            "manager" => Ok(MemberRole::Manager),
            "member" => Ok(MemberRole::Member),
            other => Err(AppError::validation(format!("Unknown role: {other}"))),
        }
    }
}

impl Display for MemberRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A rider's participation in a tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Database row id
    pub id: i64,
    /// Opaque identifier used in URLs and payloads
    pub public_id: String,
    /// Tournament row id
    pub tournament_id: i64,
    /// Participating profile row id
    pub profile_id: i64,
    /// Team row id; `None` means unassigned
    pub team_id: Option<i64>,
    /// Privilege level
    pub role: MemberRole,
}

/// Peloton session id sealed for storage
///
/// Sealed at rest with AES-256-GCM; the 12-byte nonce is prepended to the
/// ciphertext and the whole value is base64 encoded. Only opened when an
/// authenticated upstream call is about to be made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedSessionToken {
    /// base64(\[12-byte nonce\]\[ciphertext + tag\])
    pub sealed: String,
}

impl SealedSessionToken {
    /// Seal a plaintext session id
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails or the key is not 32 bytes
    pub fn seal(session_id: &str, key_bytes: &[u8]) -> AppResult<Self> {
        use base64::{engine::general_purpose, Engine as _};
        use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
        use ring::rand::{SecureRandom, SystemRandom};

        let rng = SystemRandom::new();

        let mut nonce_bytes = [0u8; 12];
        rng.fill(&mut nonce_bytes)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let unbound_key = UnboundKey::new(&AES_256_GCM, key_bytes)?;
        let key = LessSafeKey::new(unbound_key);

        let mut data = session_id.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut data)?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(data);

        Ok(Self {
            sealed: general_purpose::STANDARD.encode(combined),
        })
    }

    /// Open the sealed session id
    ///
    /// # Errors
    ///
    /// Returns an error if decryption fails, the value is malformed, or the
    /// key is wrong
    pub fn open(&self, key_bytes: &[u8]) -> AppResult<String> {
        use base64::{engine::general_purpose, Engine as _};
        use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};

        let combined = general_purpose::STANDARD.decode(&self.sealed)?;
        if combined.len() < 12 {
            return Err(AppError::internal("Sealed session token too short"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::assume_unique_for_key(nonce_bytes.try_into()?);

        let unbound_key = UnboundKey::new(&AES_256_GCM, key_bytes)?;
        let key = LessSafeKey::new(unbound_key);

        let mut data = ciphertext.to_vec();
        let plaintext = key.open_in_place(nonce, Aad::empty(), &mut data)?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| AppError::internal("Sealed session token is not valid UTF-8"))
    }
}

/// Derive the 32-byte sealing key from the deployment secret
#[must_use]
pub fn sealing_key(secret: &str) -> Vec<u8> {
    ring::digest::digest(&ring::digest::SHA256, secret.as_bytes())
        .as_ref()
        .to_vec()
}
