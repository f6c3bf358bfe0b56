// ABOUTME: Unified error handling with standard error codes and HTTP responses
// ABOUTME: Defines the ErrorCode taxonomy and the AppError type used by every handler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Pelotourney Project

//! # Unified Error Handling
//!
//! Standard error codes, the [`AppError`] carrier, and the HTTP response
//! formatting shared by all routes. Handlers return `Result<Response, AppError>`
//! and rely on the [`axum::response::IntoResponse`] impl below to produce the
//! canonical `{"error": {"code", "message"}}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Peloton rejected the supplied username/password
    #[serde(rename = "INVALID_CREDENTIALS")]
    InvalidCredentials,
    /// A stored or supplied Peloton session token failed validation
    #[serde(rename = "SESSION_INVALID")]
    SessionInvalid,
    /// The request carries no usable bearer token
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired,
    /// The caller is authenticated but not allowed to perform the action
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
    /// The addressed tournament/team/member/ride does not exist
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// Malformed form or JSON input
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// The Peloton API returned an error or could not be reached
    #[serde(rename = "EXTERNAL_API_ERROR")]
    ExternalApi,
    /// Database operation failed
    #[serde(rename = "DATABASE_ERROR")]
    Database,
    /// Anything else
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidCredentials | Self::SessionInvalid | Self::AuthRequired => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Validation => 400,
            Self::ExternalApi => 502,
            Self::Database | Self::Internal => 500,
        }
    }

    /// Get a user-facing description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid Peloton credentials",
            Self::SessionInvalid => "Peloton session is not valid",
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::Forbidden => "You do not have permission to perform this action",
            Self::NotFound => "The requested resource was not found",
            Self::Validation => "The provided input is invalid",
            Self::ExternalApi => "The Peloton API returned an error",
            Self::Database => "Database operation failed",
            Self::Internal => "An internal server error occurred",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Peloton login rejected the credentials
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid Peloton credentials")
    }

    /// A Peloton session token did not validate
    pub fn session_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SessionInvalid, message)
    }

    /// No usable bearer token on the request
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Authorization failure
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Resource lookup failure; `resource` names what was missing
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Malformed input
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Upstream Peloton API failure
    pub fn external_api(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExternalApi, message)
    }

    /// Database failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Database, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

/// Conversion from `anyhow::Error` (the database/client layers' internal type)
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        if error.downcast_ref::<sqlx::Error>().is_some() {
            return Self::new(ErrorCode::Database, error.to_string());
        }
        Self::new(ErrorCode::Internal, error.to_string())
    }
}

/// Bearer tokens that fail validation all map to a 401
impl From<crate::auth::JwtValidationError> for AppError {
    fn from(error: crate::auth::JwtValidationError) -> Self {
        Self::new(ErrorCode::AuthRequired, error.to_string())
    }
}

impl From<ring::error::Unspecified> for AppError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::new(ErrorCode::Internal, "Cryptographic operation failed")
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(error: base64::DecodeError) -> Self {
        Self::new(
            ErrorCode::Internal,
            format!("Sealed token is not valid base64: {error}"),
        )
    }
}

impl From<std::array::TryFromSliceError> for AppError {
    fn from(_: std::array::TryFromSliceError) -> Self {
        Self::new(ErrorCode::Internal, "Sealed token layout is invalid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::InvalidCredentials.http_status(), 401);
        assert_eq!(ErrorCode::SessionInvalid.http_status(), 401);
        assert_eq!(ErrorCode::Forbidden.http_status(), 403);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::Validation.http_status(), 400);
        assert_eq!(ErrorCode::ExternalApi.http_status(), 502);
        assert_eq!(ErrorCode::Internal.http_status(), 500);
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::not_found("Tournament");
        let response = ErrorResponse::from(error);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("NOT_FOUND"));
        assert!(json.contains("Tournament not found"));
    }

    #[test]
    fn test_forbidden_display() {
        let error = AppError::forbidden("not a tournament admin");
        assert_eq!(
            error.to_string(),
            "You do not have permission to perform this action: not a tournament admin"
        );
    }
}
