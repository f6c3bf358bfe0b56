// ABOUTME: Generic upsert path for entities mirrored from the Peloton API
// ABOUTME: Finalized records short-circuit; incomplete ones refresh and save
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Peloton Entity Upsert
//!
//! Every mirrored entity (profile, instructor, ride, workout) follows the
//! same lifecycle: a shell row holding only the upstream id, refreshed from
//! the API until the record is finalized, after which reads never touch the
//! network again. [`from_peloton_id`] is that lifecycle written once;
//! [`PelotonSourced`] is what an entity implements to participate.

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{Instructor, PelotonProfile, Ride, Workout};
use crate::peloton::PelotonClient;
use async_trait::async_trait;
use chrono::DateTime;

/// An entity mirrored from the Peloton API
#[async_trait]
pub trait PelotonSourced: Send + Sized {
    /// Entity label for logging
    const KIND: &'static str;

    /// Whether this record is complete and no longer needs refreshing
    fn is_finalized(&self) -> bool;

    /// Look the entity up by its upstream id
    async fn find_by_peloton_id(db: &Database, peloton_id: &str) -> AppResult<Option<Self>>;

    /// A blank record carrying only the upstream id
    fn new_shell(peloton_id: &str) -> Self;

    /// Refresh this record from the API, resolving referenced entities
    /// through their own upsert paths
    async fn update_from_api(&mut self, db: &Database, client: &PelotonClient) -> AppResult<()>;

    /// Persist the record, inserting or updating as appropriate
    async fn save(&mut self, db: &Database) -> AppResult<()>;
}

/// Resolve an entity by upstream id, refreshing it only when incomplete
///
/// A finalized record returns as stored without any network traffic. An
/// incomplete or missing record is fetched, saved, and returned.
///
/// # Errors
///
/// Returns an error if the lookup, the API refresh, or the save fails
pub async fn from_peloton_id<T: PelotonSourced>(
    db: &Database,
    client: &PelotonClient,
    peloton_id: &str,
) -> AppResult<T> {
    if let Some(mut existing) = T::find_by_peloton_id(db, peloton_id).await? {
        if existing.is_finalized() {
            return Ok(existing);
        }
        tracing::debug!(kind = T::KIND, peloton_id, "refreshing incomplete record");
        existing.update_from_api(db, client).await?;
        existing.save(db).await?;
        return Ok(existing);
    }

    tracing::debug!(kind = T::KIND, peloton_id, "fetching new record");
    let mut entity = T::new_shell(peloton_id);
    entity.update_from_api(db, client).await?;
    entity.save(db).await?;
    Ok(entity)
}

impl PelotonProfile {
    /// Resolve a profile by upstream id, username, or both
    ///
    /// Same lifecycle as [`from_peloton_id`], with the lookup widened to
    /// match either key. Supplying neither key is a validation error.
    ///
    /// # Errors
    ///
    /// Returns an error if both keys are absent or the upsert fails
    pub async fn from_peloton_id_or_username(
        db: &Database,
        client: &PelotonClient,
        peloton_id: Option<&str>,
        username: Option<&str>,
    ) -> AppResult<Self> {
        if peloton_id.is_none() && username.is_none() {
            return Err(AppError::validation(
                "A Peloton id or username is required to resolve a profile",
            ));
        }

        let existing = db
            .get_profile_by_peloton_id_or_username(peloton_id, username)
            .await?;

        let mut profile = match existing {
            Some(profile) if profile.is_finalized() => return Ok(profile),
            Some(profile) => profile,
            None => Self {
                id: 0,
                peloton_id: peloton_id.map(ToOwned::to_owned),
                username: username.unwrap_or_default().to_owned(),
                image_url: None,
                user_id: None,
                session_token: None,
                last_linked: None,
                raw: None,
            },
        };

        profile.update_from_api(db, client).await?;
        profile.save(db).await?;
        Ok(profile)
    }
}

#[async_trait]
impl PelotonSourced for PelotonProfile {
    const KIND: &'static str = "profile";

    fn is_finalized(&self) -> bool {
        // Inherent method on the model
        self.is_finalized()
    }

    async fn find_by_peloton_id(db: &Database, peloton_id: &str) -> AppResult<Option<Self>> {
        Ok(db.get_profile_by_peloton_id(peloton_id).await?)
    }

    fn new_shell(peloton_id: &str) -> Self {
        Self {
            id: 0,
            peloton_id: Some(peloton_id.to_owned()),
            username: String::new(),
            image_url: None,
            user_id: None,
            session_token: None,
            last_linked: None,
            raw: None,
        }
    }

    async fn update_from_api(&mut self, _db: &Database, client: &PelotonClient) -> AppResult<()> {
        let key = match (&self.peloton_id, self.username.is_empty()) {
            (Some(id), _) => id.clone(),
            (None, false) => self.username.clone(),
            (None, true) => {
                return Err(AppError::validation(
                    "Profile has neither a Peloton id nor a username",
                ))
            }
        };

        let user = client.get_user(&key).await?;
        self.peloton_id = Some(user.id);
        self.username = user.username;
        self.image_url = user.image_url;
        self.raw = Some(user.raw);
        Ok(())
    }

    async fn save(&mut self, db: &Database) -> AppResult<()> {
        if self.id == 0 {
            db.insert_profile(self).await?;
        } else {
            db.update_profile(self).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PelotonSourced for Instructor {
    const KIND: &'static str = "instructor";

    fn is_finalized(&self) -> bool {
        self.is_finalized()
    }

    async fn find_by_peloton_id(db: &Database, peloton_id: &str) -> AppResult<Option<Self>> {
        Ok(db.get_instructor_by_peloton_id(peloton_id).await?)
    }

    fn new_shell(peloton_id: &str) -> Self {
        Self {
            id: 0,
            peloton_id: peloton_id.to_owned(),
            name: None,
            image_url: None,
            raw: None,
        }
    }

    async fn update_from_api(&mut self, _db: &Database, client: &PelotonClient) -> AppResult<()> {
        let instructor = client.get_instructor(&self.peloton_id).await?;
        self.name = instructor.name;
        self.image_url = instructor.image_url;
        self.raw = Some(instructor.raw);
        Ok(())
    }

    async fn save(&mut self, db: &Database) -> AppResult<()> {
        if self.id == 0 {
            db.insert_instructor(self).await?;
        } else {
            db.update_instructor(self).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PelotonSourced for Ride {
    const KIND: &'static str = "ride";

    fn is_finalized(&self) -> bool {
        self.is_finalized()
    }

    async fn find_by_peloton_id(db: &Database, peloton_id: &str) -> AppResult<Option<Self>> {
        Ok(db.get_ride_by_peloton_id(peloton_id).await?)
    }

    fn new_shell(peloton_id: &str) -> Self {
        Self {
            id: 0,
            peloton_id: peloton_id.to_owned(),
            title: None,
            description: None,
            image_url: None,
            scheduled_start_time: None,
            instructor_id: None,
            raw: None,
        }
    }

    async fn update_from_api(&mut self, db: &Database, client: &PelotonClient) -> AppResult<()> {
        let ride = client.get_ride(&self.peloton_id).await?;
        self.title = ride.title;
        self.description = ride.description;
        self.image_url = ride.image_url;
        self.scheduled_start_time = ride
            .scheduled_start_time
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        if let Some(instructor_peloton_id) = ride.instructor_id {
            let instructor =
                from_peloton_id::<Instructor>(db, client, &instructor_peloton_id).await?;
            self.instructor_id = Some(instructor.id);
        }

        self.raw = Some(ride.raw);
        Ok(())
    }

    async fn save(&mut self, db: &Database) -> AppResult<()> {
        if self.id == 0 {
            db.insert_ride(self).await?;
        } else {
            db.update_ride(self).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PelotonSourced for Workout {
    const KIND: &'static str = "workout";

    fn is_finalized(&self) -> bool {
        self.is_finalized()
    }

    async fn find_by_peloton_id(db: &Database, peloton_id: &str) -> AppResult<Option<Self>> {
        Ok(db.get_workout_by_peloton_id(peloton_id).await?)
    }

    fn new_shell(peloton_id: &str) -> Self {
        Self {
            id: 0,
            peloton_id: peloton_id.to_owned(),
            ride_id: None,
            profile_id: 0,
            status: None,
            start_time: None,
            end_time: None,
            total_work: None,
            raw: None,
        }
    }

    async fn update_from_api(&mut self, db: &Database, client: &PelotonClient) -> AppResult<()> {
        let workout = client.get_workout(&self.peloton_id).await?;
        self.status = workout.status;
        self.total_work = workout.total_work;
        self.start_time = workout
            .start_time
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        self.end_time = workout
            .end_time
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        if let Some(ride_ref) = workout.ride {
            let ride = from_peloton_id::<Ride>(db, client, &ride_ref.id).await?;
            self.ride_id = Some(ride.id);
        }

        let profile = PelotonProfile::from_peloton_id_or_username(
            db,
            client,
            Some(&workout.user_id),
            None,
        )
        .await?;
        self.profile_id = profile.id;

        self.raw = Some(workout.raw);
        Ok(())
    }

    async fn save(&mut self, db: &Database) -> AppResult<()> {
        if self.id == 0 {
            db.insert_workout(self).await?;
        } else {
            db.update_workout(self).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::models::sealing_key;

    async fn test_db() -> Database {
        let db = Database::new("sqlite::memory:", sealing_key("test-secret"))
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    /// A client whose every request fails, proving a code path stayed off
    /// the network
    fn unroutable_client() -> PelotonClient {
        PelotonClient::new("http://127.0.0.1:1")
    }

    #[tokio::test]
    async fn test_finalized_instructor_skips_network() {
        let db = test_db().await;

        let mut stored = Instructor {
            id: 0,
            peloton_id: "inst-1".to_owned(),
            name: Some("Alex".to_owned()),
            image_url: None,
            raw: None,
        };
        db.insert_instructor(&mut stored).await.unwrap();

        let found = from_peloton_id::<Instructor>(&db, &unroutable_client(), "inst-1")
            .await
            .unwrap();

        assert_eq!(found.id, stored.id);
        assert_eq!(found.name.as_deref(), Some("Alex"));
    }

    #[tokio::test]
    async fn test_finalized_ride_skips_network() {
        let db = test_db().await;

        let mut stored = Ride {
            id: 0,
            peloton_id: "ride-1".to_owned(),
            title: Some("30 min climb".to_owned()),
            description: None,
            image_url: None,
            scheduled_start_time: None,
            instructor_id: None,
            raw: None,
        };
        db.insert_ride(&mut stored).await.unwrap();

        let found = from_peloton_id::<Ride>(&db, &unroutable_client(), "ride-1")
            .await
            .unwrap();

        assert_eq!(found.id, stored.id);
        assert_eq!(found.title.as_deref(), Some("30 min climb"));
    }

    #[tokio::test]
    async fn test_incomplete_record_refresh_fails_without_network() {
        let db = test_db().await;

        let mut stored = Ride {
            id: 0,
            peloton_id: "ride-2".to_owned(),
            title: None,
            description: None,
            image_url: None,
            scheduled_start_time: None,
            instructor_id: None,
            raw: None,
        };
        db.insert_ride(&mut stored).await.unwrap();

        let err = from_peloton_id::<Ride>(&db, &unroutable_client(), "ride-2")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ExternalApi);
    }

    #[tokio::test]
    async fn test_profile_lookup_requires_a_key() {
        let db = test_db().await;

        let err =
            PelotonProfile::from_peloton_id_or_username(&db, &unroutable_client(), None, None)
                .await
                .unwrap_err();

        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn test_finalized_profile_found_by_username() {
        let db = test_db().await;

        let mut stored = PelotonProfile {
            id: 0,
            peloton_id: Some("user-9".to_owned()),
            username: "rider_nine".to_owned(),
            image_url: Some("https://img.example/9.png".to_owned()),
            user_id: None,
            session_token: None,
            last_linked: None,
            raw: None,
        };
        db.insert_profile(&mut stored).await.unwrap();

        let found = PelotonProfile::from_peloton_id_or_username(
            &db,
            &unroutable_client(),
            None,
            Some("rider_nine"),
        )
        .await
        .unwrap();

        assert_eq!(found.id, stored.id);
        assert_eq!(found.peloton_id.as_deref(), Some("user-9"));
    }
}
