// ABOUTME: Integration tests for the window-function leaderboard queries
// ABOUTME: Covers best-per-ride selection, team totals, ties, NULLs, and standings order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

//! Exercises the leaderboard SQL directly against a seeded in-memory
//! database: one best workout per (ride, rider), team totals, and the
//! standings sort with its tie-breaks.

mod common;

use chrono::{TimeZone, Utc};
use common::create_test_database;
use pelotourney::database::Database;
use pelotourney::models::{
    MemberRole, PelotonProfile, Ride, Team, Tournament, TournamentVisibility, Workout,
};

async fn seed_tournament(db: &Database) -> Tournament {
    db.create_tournament(
        "January Challenge",
        TournamentVisibility::Private,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 14, 23, 59, 59).unwrap(),
    )
    .await
    .unwrap()
}

async fn seed_profile(db: &Database, username: &str) -> PelotonProfile {
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
    db.insert_profile(&mut profile).await.unwrap();
    profile
}

async fn seed_attached_ride(db: &Database, tournament: &Tournament, peloton_id: &str) -> Ride {
    let mut ride = Ride {
        id: 0,
        peloton_id: peloton_id.to_owned(),
        title: Some(format!("{peloton_id} class")),
        description: None,
        image_url: None,
        scheduled_start_time: None,
        instructor_id: None,
        raw: None,
    };
    db.insert_ride(&mut ride).await.unwrap();
    db.attach_ride(tournament.id, ride.id).await.unwrap();
    ride
}

async fn seed_workout(
    db: &Database,
    profile: &PelotonProfile,
    ride: &Ride,
    peloton_id: &str,
    total_work: Option<f64>,
) -> Workout {
    let mut workout = Workout {
        id: 0,
        peloton_id: peloton_id.to_owned(),
        ride_id: Some(ride.id),
        profile_id: profile.id,
        status: Some(Workout::STATUS_COMPLETE.to_owned()),
        start_time: None,
        end_time: None,
        total_work,
        raw: None,
    };
    db.insert_workout(&mut workout).await.unwrap();
    workout
}

async fn add_to_team(db: &Database, tournament: &Tournament, profile: &PelotonProfile, team: &Team) {
    let membership = db
        .add_member(tournament.id, profile.id, MemberRole::Member)
        .await
        .unwrap();
    db.set_membership_team(membership.id, Some(team.id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_best_workout_per_ride_counts_once() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;
    let ride = seed_attached_ride(&db, &tournament, "ride-1").await;
    let alice = seed_profile(&db, "alice").await;

    seed_workout(&db, &alice, &ride, "w1", Some(500_000.0)).await;
    seed_workout(&db, &alice, &ride, "w2", Some(800_000.0)).await;
    seed_workout(&db, &alice, &ride, "w3", Some(650_000.0)).await;

    let best = db
        .best_workouts_for_profile(tournament.id, alice.id)
        .await
        .unwrap();

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].peloton_id, "w2");
    assert!((best[0].total_work.unwrap() - 800_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_profile_best_workouts_are_ordered_by_ride() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;
    let ride_a = seed_attached_ride(&db, &tournament, "ride-a").await;
    let ride_b = seed_attached_ride(&db, &tournament, "ride-b").await;
    let alice = seed_profile(&db, "alice").await;

    // Inserted against the later ride first; results come back by ride id
    seed_workout(&db, &alice, &ride_b, "w1", Some(300_000.0)).await;
    seed_workout(&db, &alice, &ride_a, "w2", Some(700_000.0)).await;

    let best = db
        .best_workouts_for_profile(tournament.id, alice.id)
        .await
        .unwrap();

    assert_eq!(best.len(), 2);
    assert_eq!(best[0].ride_id, Some(ride_a.id));
    assert_eq!(best[1].ride_id, Some(ride_b.id));
}

#[tokio::test]
async fn test_team_total_sums_best_per_ride_and_rider() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;
    let ride_1 = seed_attached_ride(&db, &tournament, "ride-1").await;
    let ride_2 = seed_attached_ride(&db, &tournament, "ride-2").await;

    let alice = seed_profile(&db, "alice").await;
    let bob = seed_profile(&db, "bob").await;
    let carol = seed_profile(&db, "carol").await;

    let team_a = db.create_team(tournament.id, "Team A").await.unwrap();
    let team_b = db.create_team(tournament.id, "Team B").await.unwrap();
    add_to_team(&db, &tournament, &alice, &team_a).await;
    add_to_team(&db, &tournament, &bob, &team_a).await;
    add_to_team(&db, &tournament, &carol, &team_b).await;

    seed_workout(&db, &alice, &ride_1, "w1", Some(800_000.0)).await;
    seed_workout(&db, &alice, &ride_2, "w2", Some(300_000.0)).await;
    seed_workout(&db, &bob, &ride_1, "w3", Some(700_000.0)).await;
    seed_workout(&db, &carol, &ride_1, "w4", Some(900_000.0)).await;

    let standings = db.get_team_standings(tournament.id).await.unwrap();

    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].team.name, "Team A");
    assert!((standings[0].total_output - 1_800_000.0).abs() < f64::EPSILON);
    assert_eq!(standings[1].team.name, "Team B");
    assert!((standings[1].total_output - 900_000.0).abs() < f64::EPSILON);

    // Team A's contributing workouts come back ride-major, rider-minor
    let best = &standings[0].best_workouts;
    assert_eq!(best.len(), 3);
    assert_eq!(
        (best[0].ride_id, best[0].profile_id),
        (Some(ride_1.id), alice.id)
    );
    assert_eq!(
        (best[1].ride_id, best[1].profile_id),
        (Some(ride_1.id), bob.id)
    );
    assert_eq!(
        (best[2].ride_id, best[2].profile_id),
        (Some(ride_2.id), alice.id)
    );
}

#[tokio::test]
async fn test_equal_output_goes_to_the_first_recorded_workout() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;
    let ride = seed_attached_ride(&db, &tournament, "ride-1").await;
    let alice = seed_profile(&db, "alice").await;

    seed_workout(&db, &alice, &ride, "w1", Some(500_000.0)).await;
    seed_workout(&db, &alice, &ride, "w2", Some(500_000.0)).await;

    let best = db
        .best_workouts_for_profile(tournament.id, alice.id)
        .await
        .unwrap();

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].peloton_id, "w1");
}

#[tokio::test]
async fn test_missing_output_ranks_below_any_recorded_output() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;
    let ride = seed_attached_ride(&db, &tournament, "ride-1").await;
    let alice = seed_profile(&db, "alice").await;

    seed_workout(&db, &alice, &ride, "w1", None).await;
    seed_workout(&db, &alice, &ride, "w2", Some(400_000.0)).await;

    let best = db
        .best_workouts_for_profile(tournament.id, alice.id)
        .await
        .unwrap();

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].peloton_id, "w2");
}

#[tokio::test]
async fn test_team_with_only_missing_output_totals_zero() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;
    let ride = seed_attached_ride(&db, &tournament, "ride-1").await;
    let alice = seed_profile(&db, "alice").await;
    let team = db.create_team(tournament.id, "Team A").await.unwrap();
    add_to_team(&db, &tournament, &alice, &team).await;

    seed_workout(&db, &alice, &ride, "w1", None).await;

    let standings = db.get_team_standings(tournament.id).await.unwrap();

    assert_eq!(standings.len(), 1);
    assert!(standings[0].total_output.abs() < f64::EPSILON);
    assert_eq!(standings[0].best_workouts.len(), 1);
    assert!(standings[0].best_workouts[0].total_work.is_none());
}

#[tokio::test]
async fn test_empty_teams_tie_by_creation_order() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;

    // Created out of name order on purpose: ties break by team id, not name
    db.create_team(tournament.id, "Zebra").await.unwrap();
    db.create_team(tournament.id, "Alpha").await.unwrap();

    let standings = db.get_team_standings(tournament.id).await.unwrap();

    assert_eq!(standings.len(), 2);
    assert_eq!(standings[0].team.name, "Zebra");
    assert_eq!(standings[1].team.name, "Alpha");
    assert!(standings[0].total_output.abs() < f64::EPSILON);
    assert!(standings[1].total_output.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_unattached_rides_and_unassigned_riders_do_not_score() {
    let db = create_test_database().await;
    let tournament = seed_tournament(&db).await;
    let attached = seed_attached_ride(&db, &tournament, "ride-1").await;

    let mut other_ride = Ride {
        id: 0,
        peloton_id: "ride-9".to_owned(),
        title: Some("Not in this tournament".to_owned()),
        description: None,
        image_url: None,
        scheduled_start_time: None,
        instructor_id: None,
        raw: None,
    };
    db.insert_ride(&mut other_ride).await.unwrap();

    let alice = seed_profile(&db, "alice").await;
    let dave = seed_profile(&db, "dave").await;
    let team = db.create_team(tournament.id, "Team A").await.unwrap();
    add_to_team(&db, &tournament, &alice, &team).await;
    // Dave is a member without a team assignment
    db.add_member(tournament.id, dave.id, MemberRole::Member)
        .await
        .unwrap();

    seed_workout(&db, &alice, &attached, "w1", Some(500_000.0)).await;
    seed_workout(&db, &alice, &other_ride, "w2", Some(900_000.0)).await;
    seed_workout(&db, &dave, &attached, "w3", Some(950_000.0)).await;

    let best = db
        .best_workouts_for_profile(tournament.id, alice.id)
        .await
        .unwrap();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].peloton_id, "w1");

    let standings = db.get_team_standings(tournament.id).await.unwrap();
    assert_eq!(standings.len(), 1);
    assert!((standings[0].total_output - 500_000.0).abs() < f64::EPSILON);
}
