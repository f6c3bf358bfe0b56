// ABOUTME: HTTP tests for attaching, listing, and detaching tournament rides
// ABOUTME: Exercises the upstream ride upsert and the filter-metadata proxy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

//! Ride endpoints end to end: attaching pulls ride and instructor metadata
//! from the stub Peloton API, listing is a viewer surface, and detaching
//! removes only the tournament link.

mod common;

use axum::Router;
use chrono::Utc;
use common::{
    create_test_app, create_test_user, delete_request, get_request, instructor_payload,
    json_request, ride_payload, send, spawn_stub_peloton, StubData,
};
use pelotourney::models::PelotonProfile;
use pelotourney::routes::ServerResources;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

async fn link_profile(
    resources: &ServerResources,
    user_id: Uuid,
    username: &str,
) -> PelotonProfile {
    let mut profile = PelotonProfile {
        id: 0,
        peloton_id: Some(format!("pid-{username}")),
        username: username.to_owned(),
        image_url: Some(format!("https://img.example/{username}.png")),
        user_id: Some(user_id),
        session_token: None,
        last_linked: Some(Utc::now()),
        raw: None,
    };
    resources
        .database
        .insert_profile(&mut profile)
        .await
        .unwrap();
    profile
}

/// App with "alice" owning a fresh tournament of the given visibility
async fn setup(
    peloton_base_url: &str,
    visibility: &str,
) -> (Router, Arc<ServerResources>, String, String) {
    let (app, resources) = create_test_app(peloton_base_url).await;
    let (alice, token) = create_test_user(&resources, "alice@example.com").await;
    link_profile(&resources, alice.id, "alice").await;

    let body = json!({
        "name": "January Challenge",
        "visibility": visibility,
        "start_date": "2024-01-01",
        "end_date": "2024-01-14",
    });
    let (status, created) =
        send(&app, json_request("POST", "/tournaments", Some(&token), &body)).await;
    assert_eq!(status, 201);
    let id = created["id"].as_str().unwrap().to_owned();

    (app, resources, token, id)
}

fn stub_with_ride() -> StubData {
    let mut data = StubData::new();
    data.rides.insert(
        "ride-1".into(),
        ride_payload("ride-1", "Power Zone", Some("inst-1")),
    );
    data.instructors.insert(
        "inst-1".into(),
        instructor_payload("inst-1", "Matt Wilpers"),
    );
    data
}

#[tokio::test]
async fn test_attaching_a_ride_pulls_its_metadata() {
    let base_url = spawn_stub_peloton(stub_with_ride()).await;
    let (app, _resources, token, id) = setup(&base_url, "private").await;

    let path = format!("/tournaments/{id}/rides");
    let (status, ride) = send(
        &app,
        json_request("POST", &path, Some(&token), &json!({"ride_id": "ride-1"})),
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(ride["id"], "ride-1");
    assert_eq!(ride["title"], "Power Zone");
    assert_eq!(ride["instructor"]["name"], "Matt Wilpers");

    let (status, listing) = send(&app, get_request(&path, Some(&token))).await;
    assert_eq!(status, 200);
    let rides = listing["rides"].as_array().unwrap();
    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0]["id"], "ride-1");
}

#[tokio::test]
async fn test_blank_ride_id_is_rejected() {
    let (app, _resources, token, id) = setup("http://127.0.0.1:1", "private").await;

    let path = format!("/tournaments/{id}/rides");
    let (status, response) = send(
        &app,
        json_request("POST", &path, Some(&token), &json!({"ride_id": "  "})),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_attaching_requires_an_admin() {
    // The admin check fires before any upstream call, so an unroutable
    // base URL proves it
    let (app, resources, _token, id) = setup("http://127.0.0.1:1", "private").await;

    let (bob, bob_token) = create_test_user(&resources, "bob@example.com").await;
    link_profile(&resources, bob.id, "bob").await;

    let path = format!("/tournaments/{id}/rides");
    let (status, response) = send(
        &app,
        json_request("POST", &path, Some(&bob_token), &json!({"ride_id": "ride-1"})),
    )
    .await;

    assert_eq!(status, 403);
    assert_eq!(response["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_public_tournament_rides_are_open_to_viewers() {
    let base_url = spawn_stub_peloton(stub_with_ride()).await;
    let (app, _resources, token, id) = setup(&base_url, "public").await;

    let path = format!("/tournaments/{id}/rides");
    send(
        &app,
        json_request("POST", &path, Some(&token), &json!({"ride_id": "ride-1"})),
    )
    .await;

    let (status, listing) = send(&app, get_request(&path, None)).await;
    assert_eq!(status, 200);
    assert_eq!(listing["rides"][0]["title"], "Power Zone");
}

#[tokio::test]
async fn test_ride_filters_are_proxied_for_admins_only() {
    let mut data = StubData::new();
    data.ride_filters = json!({"filters": [{"name": "duration", "values": [20, 30, 45]}]});
    let base_url = spawn_stub_peloton(data).await;
    let (app, _resources, token, id) = setup(&base_url, "private").await;

    let path = format!("/tournaments/{id}/rides/filters");
    let (status, body) = send(&app, get_request(&path, Some(&token))).await;
    assert_eq!(status, 200);
    assert_eq!(body["filters"][0]["name"], "duration");

    let (status, response) = send(&app, get_request(&path, None)).await;
    assert_eq!(status, 401);
    assert_eq!(response["error"]["code"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_detaching_a_ride_removes_only_the_link() {
    let base_url = spawn_stub_peloton(stub_with_ride()).await;
    let (app, resources, token, id) = setup(&base_url, "private").await;

    let path = format!("/tournaments/{id}/rides");
    send(
        &app,
        json_request("POST", &path, Some(&token), &json!({"ride_id": "ride-1"})),
    )
    .await;

    let ride_path = format!("/tournaments/{id}/rides/ride-1");
    let (status, body) = send(&app, delete_request(&ride_path, Some(&token))).await;
    assert_eq!(status, 204);
    assert_eq!(body, Value::Null);

    let (_, listing) = send(&app, get_request(&path, Some(&token))).await;
    assert_eq!(listing["rides"], json!([]));

    // The mirrored ride row itself survives the detach
    let stored = resources
        .database
        .get_ride_by_peloton_id("ride-1")
        .await
        .unwrap();
    assert!(stored.is_some());

    let (status, response) = send(&app, delete_request(&ride_path, Some(&token))).await;
    assert_eq!(status, 404);
    assert_eq!(response["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_attaching_twice_is_idempotent() {
    let base_url = spawn_stub_peloton(stub_with_ride()).await;
    let (app, _resources, token, id) = setup(&base_url, "private").await;

    let path = format!("/tournaments/{id}/rides");
    let body = json!({"ride_id": "ride-1"});
    let (status, _) = send(&app, json_request("POST", &path, Some(&token), &body)).await;
    assert_eq!(status, 201);
    let (status, _) = send(&app, json_request("POST", &path, Some(&token), &body)).await;
    assert_eq!(status, 201);

    let (_, listing) = send(&app, get_request(&path, Some(&token))).await;
    assert_eq!(listing["rides"].as_array().unwrap().len(), 1);
}
