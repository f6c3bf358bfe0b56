// ABOUTME: Server binary for the Pelotourney tournament API
// ABOUTME: Loads configuration, opens the database, and serves the axum router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Pelotourney Server Binary
//!
//! Starts the tournament API: environment-driven configuration, SQLite
//! migrations, and the full HTTP surface on one port.

use anyhow::Result;
use clap::Parser;
use pelotourney::auth::AuthManager;
use pelotourney::config::ServerConfig;
use pelotourney::database::Database;
use pelotourney::logging;
use pelotourney::models::sealing_key;
use pelotourney::routes::{self, ServerResources};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "pelotourney-server")]
#[command(about = "Pelotourney - team tournaments over Peloton workouts")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Containers sometimes hand over mangled argv; fall back to env-only
    // configuration rather than dying before logging is up
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Argument parsing failed: {e}");
            eprintln!("Using environment configuration");
            Args {
                http_port: None,
                database_url: None,
            }
        }
    };

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Pelotourney server");
    info!("{}", config.summary());

    let database_url = args
        .database_url
        .unwrap_or_else(|| config.database.url.to_connection_string());
    let database = Database::new(&database_url, sealing_key(&config.auth.jwt_secret)).await?;
    if config.database.auto_migrate {
        database.migrate().await?;
        info!("Database migrations complete");
    }

    let auth_manager = {
        // Safe: JWT expiry hours are small positive configuration values
        #[allow(clippy::cast_possible_wrap)]
        {
            AuthManager::new(&config.auth.jwt_secret, config.auth.jwt_expiry_hours as i64)
        }
    };

    let http_port = config.http_port;
    let resources = Arc::new(ServerResources::new(database, auth_manager, config));
    let app = routes::router(resources);

    display_available_endpoints(http_port);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", http_port)).await?;
    info!("Listening on port {http_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {e}");
        return;
    }
    info!("Shutdown signal received");
}

#[allow(clippy::cognitive_complexity)]
fn display_available_endpoints(port: u16) {
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());

    info!("=== Available API Endpoints ===");
    info!("Profile:");
    info!("   Link Peloton:      POST http://{host}:{port}/profile/link");
    info!("   Link Status:       GET  http://{host}:{port}/profile");
    info!("Tournaments:");
    info!("   List Buckets:      GET  http://{host}:{port}/tournaments");
    info!("   Create:            POST http://{host}:{port}/tournaments");
    info!("   Detail:            GET  http://{host}:{port}/tournaments/{{id}}");
    info!("   Update:            PUT  http://{host}:{port}/tournaments/{{id}}");
    info!("   Leaderboard:       GET  http://{host}:{port}/tournaments/{{id}}/leaderboard");
    info!("   Sync:              POST http://{host}:{port}/tournaments/{{id}}/sync");
    info!("Riders & Teams:");
    info!("   Search Riders:     GET  http://{host}:{port}/tournaments/{{id}}/riders/search");
    info!("   Add Rider:         POST http://{host}:{port}/tournaments/{{id}}/riders");
    info!("   Remove Rider:      DELETE http://{host}:{port}/tournaments/{{id}}/riders/{{member_id}}");
    info!("   Assign Teams:      PUT  http://{host}:{port}/tournaments/{{id}}/members/teams");
    info!("   Assign Roles:      PUT  http://{host}:{port}/tournaments/{{id}}/members/roles");
    info!("   Create Team:       POST http://{host}:{port}/tournaments/{{id}}/teams");
    info!("   Delete Team:       DELETE http://{host}:{port}/tournaments/{{id}}/teams/{{team_id}}");
    info!("Rides:");
    info!("   List Rides:        GET  http://{host}:{port}/tournaments/{{id}}/rides");
    info!("   Ride Filters:      GET  http://{host}:{port}/tournaments/{{id}}/rides/filters");
    info!("   Attach Ride:       POST http://{host}:{port}/tournaments/{{id}}/rides");
    info!("   Detach Ride:       DELETE http://{host}:{port}/tournaments/{{id}}/rides/{{ride_id}}");
    info!("Monitoring:");
    info!("   Health Check:      GET  http://{host}:{port}/health");
    info!("=== End of Endpoint List ===");
}
