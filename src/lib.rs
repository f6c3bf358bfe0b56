// ABOUTME: Library entry point for the Pelotourney tournament server
// ABOUTME: Declares the crate modules and documents the system layout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Pelotourney
//!
//! A web service for running time-boxed team tournaments over Peloton
//! workouts. Riders link their Peloton accounts, admins attach the rides
//! that count, and a sync pass mirrors workouts from the Peloton API into
//! SQLite. The leaderboard ranks teams by total output, counting each
//! rider's single best effort per ride.
//!
//! ## Layout
//!
//! - [`peloton`]: HTTP client for the Peloton API (login, session checks,
//!   entity lookups, windowed workout pagination)
//! - [`models`]: domain entities, derived workout metrics, and the sealed
//!   session token
//! - [`database`]: SQLite storage, migrations, and the leaderboard window
//!   queries
//! - [`sync`]: the upsert protocol and the tournament sync workflow
//! - [`routes`]: axum handlers and router assembly
//! - [`auth`]: bearer token validation against the shared secret
//! - [`config`]: environment-driven server configuration
//! - [`errors`]: the error taxonomy every layer reports through

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod models;
pub mod peloton;
pub mod routes;
pub mod sync;
