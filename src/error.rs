// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::services::events::ValidationError;
use crate::services::token::TokenError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Token is missing")]
    MissingToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is invalid")]
    InvalidToken,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Malformed credentials")]
    InvalidCredentials,

    #[error("Incorrect username")]
    IncorrectUsername,

    #[error("Incorrect password")]
    IncorrectPassword,

    /// Wrong owner or missing resource; the two are never distinguished.
    #[error("Resource not found or access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid => AppError::InvalidToken,
            TokenError::MissingSecret => AppError::Configuration("JWT secret not set".to_string()),
            TokenError::Encoding(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized
            | AppError::MissingToken
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::TokenRevoked
            | AppError::InvalidCredentials
            | AppError::IncorrectUsername
            | AppError::IncorrectPassword => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut fields = None;

        let (error, details) = match &self {
            AppError::Unauthorized => ("unauthorized", None),
            AppError::MissingToken => ("missing_token", Some(self.to_string())),
            AppError::TokenExpired => ("token_expired", Some(self.to_string())),
            AppError::InvalidToken => ("invalid_token", Some(self.to_string())),
            AppError::TokenRevoked => ("token_revoked", Some(self.to_string())),
            AppError::InvalidCredentials => ("invalid_credentials", Some(self.to_string())),
            AppError::IncorrectUsername => ("incorrect_username", Some(self.to_string())),
            AppError::IncorrectPassword => ("incorrect_password", Some(self.to_string())),
            AppError::Forbidden => ("forbidden", Some(self.to_string())),
            AppError::NotFound(msg) => ("not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => ("bad_request", Some(msg.clone())),
            AppError::Validation(err) => {
                let code = match err {
                    ValidationError::Fields(errors) => {
                        fields = Some(errors.as_map().clone());
                        "invalid_fields"
                    }
                    ValidationError::Ordering => "invalid_time_range",
                    ValidationError::EmptyPatch => "empty_patch",
                };
                (code, Some(err.to_string()))
            }
            AppError::Conflict(msg) => ("conflict", Some(msg.clone())),
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Server configuration error");
                ("configuration_error", Some("Server configuration error".to_string()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
