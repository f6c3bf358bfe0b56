// ABOUTME: Integration tests for file-backed SQLite databases
// ABOUTME: Covers file creation, reopening, and sealed tokens surviving a restart
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

//! Most tests run on `sqlite::memory:`; these cover the file-backed path
//! the server actually deploys with, including a full close-and-reopen
//! cycle.

mod common;

use common::TEST_JWT_SECRET;
use pelotourney::database::Database;
use pelotourney::models::{sealing_key, PelotonProfile, SealedSessionToken};

#[tokio::test]
async fn test_file_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pelotourney.db");
    let url = format!("sqlite:{}", path.display());

    let database = Database::new(&url, sealing_key(TEST_JWT_SECRET))
        .await
        .unwrap();
    database.migrate().await.unwrap();
    let created = database
        .ensure_user("alice@example.com", Some("Alice"))
        .await
        .unwrap();
    drop(database);

    assert!(path.exists());

    // Migrations are idempotent, so a restart runs them again harmlessly
    let reopened = Database::new(&url, sealing_key(TEST_JWT_SECRET))
        .await
        .unwrap();
    reopened.migrate().await.unwrap();

    let user = reopened
        .get_user_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.id, created.id);
    assert_eq!(user.display_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn test_sealed_tokens_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("pelotourney.db").display());

    let database = Database::new(&url, sealing_key(TEST_JWT_SECRET))
        .await
        .unwrap();
    database.migrate().await.unwrap();

    let mut profile = PelotonProfile {
        id: 0,
        peloton_id: Some("rider-1".to_owned()),
        username: "alice".to_owned(),
        image_url: None,
        user_id: None,
        session_token: Some(
            SealedSessionToken::seal("session-123", database.sealing_key()).unwrap(),
        ),
        last_linked: None,
        raw: None,
    };
    database.insert_profile(&mut profile).await.unwrap();
    drop(database);

    // The sealing key derives from the secret, so a fresh process with the
    // same secret can still open stored tokens
    let reopened = Database::new(&url, sealing_key(TEST_JWT_SECRET))
        .await
        .unwrap();
    let stored = reopened
        .get_profile_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    let session_id = stored
        .session_token
        .unwrap()
        .open(reopened.sealing_key())
        .unwrap();
    assert_eq!(session_id, "session-123");
}
