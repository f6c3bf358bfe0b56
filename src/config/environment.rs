// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, database URLs, and Peloton API runtime configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! Environment-based configuration management for production deployment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Type-safe database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database with file path
    SQLite { path: PathBuf },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        if let Some(path_str) = s.strip_prefix("sqlite:") {
            if path_str == ":memory:" {
                DatabaseUrl::Memory
            } else {
                DatabaseUrl::SQLite {
                    path: PathBuf::from(path_str),
                }
            }
        } else {
            // Bare strings are treated as SQLite file paths
            DatabaseUrl::SQLite {
                path: PathBuf::from(s),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            DatabaseUrl::SQLite { path } => format!("sqlite:{}", path.display()),
            DatabaseUrl::Memory => "sqlite::memory:".to_string(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, DatabaseUrl::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        DatabaseUrl::SQLite {
            path: PathBuf::from("./data/pelotourney.db"),
        }
    }
}

impl std::fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Top-level server configuration loaded from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Peloton API configuration
    pub peloton: PelotonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite path or in-memory)
    pub url: DatabaseUrl,
    /// Run schema migrations on startup
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for JWT validation and signing
    pub jwt_secret: String,
    /// JWT expiry time in hours for locally issued tokens
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PelotonConfig {
    /// Peloton API base URL
    pub base_url: String,
    /// Hours past a tournament's end date during which workouts still count.
    /// Peloton timestamps are UTC while tournament dates are plain dates, so
    /// a ride finished late in the evening in a western timezone can land
    /// after the nominal end of the final day.
    pub sync_end_grace_hours: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value
    /// fails to parse
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = ServerConfig {
            http_port: env_var_or("HTTP_PORT", "8080")
                .parse()
                .context("Invalid HTTP_PORT value")?,
            log_level: LogLevel::from_str_or_default(&env_var_or("LOG_LEVEL", "info")),

            database: DatabaseConfig {
                url: DatabaseUrl::parse_url(&env_var_or(
                    "DATABASE_URL",
                    "sqlite:./data/pelotourney.db",
                )),
                auto_migrate: env_var_or("AUTO_MIGRATE", "true")
                    .parse()
                    .context("Invalid AUTO_MIGRATE value")?,
            },

            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .context("JWT_SECRET must be set to validate bearer tokens")?,
                jwt_expiry_hours: env_var_or("JWT_EXPIRY_HOURS", "24")
                    .parse()
                    .context("Invalid JWT_EXPIRY_HOURS value")?,
            },

            peloton: PelotonConfig {
                base_url: env_var_or("PELOTON_BASE_URL", "https://api.onepeloton.com"),
                sync_end_grace_hours: env_var_or("PELOTON_SYNC_END_GRACE_HOURS", "12")
                    .parse()
                    .context("Invalid PELOTON_SYNC_END_GRACE_HOURS value")?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error when a value is outside its accepted range
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 bytes of entropy"
            ));
        }

        if self.peloton.sync_end_grace_hours < 0 || self.peloton.sync_end_grace_hours > 48 {
            return Err(anyhow::anyhow!(
                "PELOTON_SYNC_END_GRACE_HOURS must be between 0 and 48"
            ));
        }

        url::Url::parse(&self.peloton.base_url)
            .context("PELOTON_BASE_URL is not a valid URL")?;

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Pelotourney Server Configuration:\n\
             - HTTP Port: {}\n\
             - Log Level: {}\n\
             - Database: {}\n\
             - Auto Migrate: {}\n\
             - Peloton API: {}\n\
             - Sync End Grace: {}h",
            self.http_port,
            self.log_level,
            if self.database.url.is_memory() {
                "SQLite (in-memory)"
            } else {
                "SQLite"
            },
            self.database.auto_migrate,
            self.peloton.base_url,
            self.peloton.sync_end_grace_hours,
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str_or_default("error"), LogLevel::Error);
        assert_eq!(LogLevel::from_str_or_default("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_or_default("info"), LogLevel::Info);
        assert_eq!(LogLevel::from_str_or_default("Debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_or_default("trace"), LogLevel::Trace);
        assert_eq!(LogLevel::from_str_or_default("invalid"), LogLevel::Info);
    }

    #[test]
    fn test_database_url_parsing() {
        let sqlite_url = DatabaseUrl::parse_url("sqlite:./test.db");
        assert!(!sqlite_url.is_memory());
        assert_eq!(sqlite_url.to_connection_string(), "sqlite:./test.db");

        let memory_url = DatabaseUrl::parse_url("sqlite::memory:");
        assert!(memory_url.is_memory());
        assert_eq!(memory_url.to_connection_string(), "sqlite::memory:");

        // Bare paths fall back to SQLite files
        let bare = DatabaseUrl::parse_url("./data/app.db");
        assert_eq!(bare.to_connection_string(), "sqlite:./data/app.db");
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let config = ServerConfig {
            http_port: 8080,
            log_level: LogLevel::Info,
            database: DatabaseConfig {
                url: DatabaseUrl::Memory,
                auto_migrate: true,
            },
            auth: AuthConfig {
                jwt_secret: "short".into(),
                jwt_expiry_hours: 24,
            },
            peloton: PelotonConfig {
                base_url: "https://api.onepeloton.com".into(),
                sync_end_grace_hours: 12,
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_grace() {
        let config = ServerConfig {
            http_port: 8080,
            log_level: LogLevel::Info,
            database: DatabaseConfig {
                url: DatabaseUrl::Memory,
                auto_migrate: true,
            },
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".into(),
                jwt_expiry_hours: 24,
            },
            peloton: PelotonConfig {
                base_url: "https://api.onepeloton.com".into(),
                sync_end_grace_hours: 72,
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_base_url() {
        let config = ServerConfig {
            http_port: 8080,
            log_level: LogLevel::Info,
            database: DatabaseConfig {
                url: DatabaseUrl::Memory,
                auto_migrate: true,
            },
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".into(),
                jwt_expiry_hours: 24,
            },
            peloton: PelotonConfig {
                base_url: "not a url".into(),
                sync_end_grace_hours: 12,
            },
        };
        assert!(config.validate().is_err());
    }
}
