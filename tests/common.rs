// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides database, config, token, and stub Peloton API helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `pelotourney`
//!
//! Common setup for integration tests: an in-memory database, a server
//! router wired to a configurable Peloton base URL, bearer tokens, and a
//! stub Peloton API served from a local port.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pelotourney::auth::AuthManager;
use pelotourney::config::{
    AuthConfig, DatabaseConfig, DatabaseUrl, LogLevel, PelotonConfig, ServerConfig,
};
use pelotourney::database::Database;
use pelotourney::models::{sealing_key, User};
use pelotourney::routes::{self, ServerResources};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Once};
use tower::ServiceExt;

/// Secret shared by test tokens and the test server config
pub const TEST_JWT_SECRET: &str = "pelotourney-test-secret-0123456789abcdef";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard in-memory test database, migrated
pub async fn create_test_database() -> Arc<Database> {
    init_test_logging();
    let database = Database::new("sqlite::memory:", sealing_key(TEST_JWT_SECRET))
        .await
        .expect("in-memory database");
    database.migrate().await.expect("migrations");
    Arc::new(database)
}

/// Test server configuration pointing Peloton calls at `peloton_base_url`
pub fn test_config(peloton_base_url: &str) -> ServerConfig {
    ServerConfig {
        http_port: 0,
        log_level: LogLevel::Warn,
        database: DatabaseConfig {
            url: DatabaseUrl::Memory,
            auto_migrate: true,
        },
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
        },
        peloton: PelotonConfig {
            base_url: peloton_base_url.to_string(),
            sync_end_grace_hours: 12,
        },
    }
}

/// Auth manager sharing the test secret
pub fn create_test_auth_manager() -> AuthManager {
    AuthManager::new(TEST_JWT_SECRET, 24)
}

/// Full application router over an in-memory database
///
/// `peloton_base_url` decides where outbound Peloton calls go; point it at
/// a stub from [`spawn_stub_peloton`], or at an unroutable address to prove
/// a path stays off the network.
pub async fn create_test_app(peloton_base_url: &str) -> (Router, Arc<ServerResources>) {
    let database = create_test_database().await;
    let resources = Arc::new(ServerResources {
        database,
        auth_manager: Arc::new(create_test_auth_manager()),
        config: Arc::new(test_config(peloton_base_url)),
    });
    (routes::router(resources.clone()), resources)
}

/// Create a local account and mint a bearer token for it
pub async fn create_test_user(
    resources: &ServerResources,
    email: &str,
) -> (User, String) {
    let user = resources
        .database
        .ensure_user(email, Some("Test Rider"))
        .await
        .expect("ensure user");
    let token = resources
        .auth_manager
        .generate_token(&user)
        .expect("mint token");
    (user, token)
}

/// Build a GET request, optionally with a bearer token
pub fn get_request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

/// Build a DELETE request, optionally with a bearer token
pub fn delete_request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

/// Build a JSON-bodied request, optionally with a bearer token
pub fn json_request(
    method: &str,
    path: &str,
    token: Option<&str>,
    body: &Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Drive one request through the router and decode the JSON response
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Canned upstream payloads served by the stub Peloton API
///
/// Lookup maps are keyed by the path parameter; the workout listing serves
/// `workout_pages[N]` for `page=N` and an empty page past the end.
#[derive(Debug, Default)]
pub struct StubData {
    /// `session_id` handed out by login
    pub session_id: String,
    /// `user_id` handed out by login
    pub login_user_id: String,
    /// Whether login succeeds
    pub accept_login: bool,
    /// Whether `check_session` reports the session as live
    pub session_valid: bool,
    /// Payload for `/api/me`
    pub me: Value,
    /// Users by id or username
    pub users: HashMap<String, Value>,
    /// Instructors by id
    pub instructors: HashMap<String, Value>,
    /// Rides by id
    pub rides: HashMap<String, Value>,
    /// Workout details by id
    pub workouts: HashMap<String, Value>,
    /// Workout listing pages, newest first within and across pages
    pub workout_pages: Vec<Vec<Value>>,
    /// Payload for `/api/ride/filters`
    pub ride_filters: Value,
    /// Payloads for `/api/user/search`
    pub search_results: Vec<Value>,
}

impl StubData {
    pub fn new() -> Self {
        Self {
            session_id: "stub-session".to_string(),
            login_user_id: "stub-user".to_string(),
            accept_login: true,
            session_valid: true,
            ..Self::default()
        }
    }
}

/// Serve a stub Peloton API on a local port, returning its base URL
pub async fn spawn_stub_peloton(data: StubData) -> String {
    let state = Arc::new(data);
    let app = Router::new()
        .route("/auth/login", post(stub_login))
        .route("/auth/check_session", get(stub_check_session))
        .route("/api/me", get(stub_me))
        .route("/api/user/search", get(stub_search))
        .route("/api/user/:key", get(stub_user))
        .route("/api/user/:key/workouts", get(stub_workouts))
        .route("/api/instructor/:id", get(stub_instructor))
        .route("/api/ride/filters", get(stub_ride_filters))
        .route("/api/ride/:id", get(stub_ride))
        .route("/api/workout/:id", get(stub_workout))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{addr}")
}

async fn stub_login(State(data): State<Arc<StubData>>) -> Response {
    if data.accept_login {
        Json(json!({
            "session_id": data.session_id,
            "user_id": data.login_user_id,
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Login failed"})),
        )
            .into_response()
    }
}

async fn stub_check_session(State(data): State<Arc<StubData>>) -> Json<Value> {
    Json(json!({
        "is_valid": data.session_valid,
        "user": {"username": "stub_rider"},
    }))
}

async fn stub_me(State(data): State<Arc<StubData>>) -> Json<Value> {
    Json(data.me.clone())
}

async fn stub_user(
    State(data): State<Arc<StubData>>,
    Path(key): Path<String>,
) -> Response {
    lookup(&data.users, &key)
}

async fn stub_instructor(
    State(data): State<Arc<StubData>>,
    Path(id): Path<String>,
) -> Response {
    lookup(&data.instructors, &id)
}

async fn stub_ride(State(data): State<Arc<StubData>>, Path(id): Path<String>) -> Response {
    lookup(&data.rides, &id)
}

async fn stub_workout(State(data): State<Arc<StubData>>, Path(id): Path<String>) -> Response {
    lookup(&data.workouts, &id)
}

async fn stub_ride_filters(State(data): State<Arc<StubData>>) -> Json<Value> {
    Json(data.ride_filters.clone())
}

async fn stub_search(State(data): State<Arc<StubData>>) -> Json<Value> {
    Json(json!({"data": data.search_results}))
}

async fn stub_workouts(
    State(data): State<Arc<StubData>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let page: usize = params
        .get("page")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    let records = data.workout_pages.get(page).cloned().unwrap_or_default();
    Json(json!({"data": records}))
}

fn lookup(map: &HashMap<String, Value>, key: &str) -> Response {
    map.get(key).map_or_else(
        || {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"message": "not found"})),
            )
                .into_response()
        },
        |value| Json(value.clone()).into_response(),
    )
}

/// Upstream user payload
pub fn user_payload(id: &str, username: &str, image_url: Option<&str>) -> Value {
    json!({
        "id": id,
        "username": username,
        "image_url": image_url,
        "location": "Test City",
    })
}

/// Upstream instructor payload
pub fn instructor_payload(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "image_url": format!("https://img.example/{id}.png"),
    })
}

/// Upstream ride payload
pub fn ride_payload(id: &str, title: &str, instructor_id: Option<&str>) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{title} description"),
        "image_url": format!("https://img.example/{id}.jpg"),
        "scheduled_start_time": 1_704_067_200,
        "instructor_id": instructor_id,
    })
}

/// Upstream workout detail payload
pub fn workout_payload(
    id: &str,
    user_id: &str,
    ride_id: &str,
    total_work: f64,
    start_time: i64,
    end_time: i64,
) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "status": "COMPLETED",
        "total_work": total_work,
        "start_time": start_time,
        "end_time": end_time,
        "ride": {"id": ride_id},
    })
}

/// One record of the paginated workout listing
pub fn workout_summary_payload(id: &str, created_at: i64, ride_id: &str) -> Value {
    json!({
        "id": id,
        "created_at": created_at,
        "ride": {"id": ride_id},
    })
}
