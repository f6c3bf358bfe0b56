// ABOUTME: Configuration management module for centralized server settings and parameters
// ABOUTME: Handles environment variables, database URLs, auth secrets, and Peloton API options
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! Configuration module for the Pelotourney server
//!
//! Everything is sourced from environment variables; see
//! [`environment::ServerConfig::from_env`] for the full list of knobs.

/// Environment and server configuration
pub mod environment;

pub use environment::{
    AuthConfig, DatabaseConfig, DatabaseUrl, LogLevel, PelotonConfig, ServerConfig,
};
