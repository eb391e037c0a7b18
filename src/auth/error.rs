// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Challenge sent with every 401.
const BASIC_CHALLENGE: &str = "Basic realm=\"Authentication Required\"";

/// Authentication error type.
///
/// The variants exist for logging; callers see one uniform 401 for all of
/// them so they cannot tell a bad password from an expired token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    #[error("Unknown username or wrong password")]
    InvalidCredentials,

    #[error("Token is malformed, tampered with, expired or its user is gone")]
    InvalidToken,

    #[error("Authentication scheme not accepted here")]
    UnsupportedScheme,

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Internal(_) => "internal_error",
            _ => "unauthorized",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status != StatusCode::UNAUTHORIZED {
            tracing::error!(error = %self, "Authentication failed internally");
            let body = Json(AuthErrorBody {
                error: "Internal authentication error".to_string(),
                error_code: self.error_code().to_string(),
            });
            return (status, body).into_response();
        }

        tracing::debug!(reason = %self, "Rejecting unauthenticated request");
        let body = Json(AuthErrorBody {
            error: "Unauthorized access".to_string(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
        response
    }
}
