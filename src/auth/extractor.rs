// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! Put the extractor first in the handler arguments so unauthenticated
//! requests are rejected before any input validation runs.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{
    password::{verify_decoy, verify_password},
    AuthError, AuthMethod, AuthenticatedUser, Credentials,
};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::UserRepository;

/// Basic strategy: username lookup plus bcrypt check.
///
/// `Ok(None)` means the credentials were wrong; errors are storage failures.
/// An unknown username still pays for one bcrypt verify.
pub fn verify_basic(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Option<AuthenticatedUser>, AuthError> {
    let users = UserRepository::new(&state.db);
    let user = users
        .find_by_username(username)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    match user {
        Some(user) if verify_password(password, &user.password_hash) => {
            Ok(Some(AuthenticatedUser::from_stored(user, AuthMethod::Basic)))
        }
        Some(_) => Ok(None),
        None => {
            verify_decoy(password);
            Ok(None)
        }
    }
}

/// Run `verify_basic` on the blocking pool; bcrypt is CPU-bound.
async fn verify_basic_off_thread(
    state: &AppState,
    username: String,
    password: String,
) -> Result<Option<AuthenticatedUser>, AuthError> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || verify_basic(&state, &username, &password))
        .await
        .map_err(|e| AuthError::Internal(format!("password check task: {e}")))?
}

/// Bearer strategy: token signature and expiry, then user existence.
pub fn verify_token(state: &AppState, token: &str) -> Result<Option<AuthenticatedUser>, AuthError> {
    let users = UserRepository::new(&state.db);
    let user = state
        .tokens
        .verify(token, &users)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    Ok(user.map(|user| AuthenticatedUser::from_stored(user, AuthMethod::Bearer)))
}

/// Extractor accepting either Basic or Bearer credentials.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_me(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<UserEnvelope>, ApiError> {
///     // user.user_id is the authenticated user's id
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = match Credentials::from_headers(&parts.headers)? {
            Credentials::Basic { username, password } => verify_basic_off_thread(state, username, password)
                .await?
                .ok_or(AuthError::InvalidCredentials)?,
            Credentials::Bearer(token) => verify_token(state, &token)?.ok_or(AuthError::InvalidToken)?,
        };

        tracing::debug!(user_id = user.user_id, method = ?user.method, "Request authenticated");
        Ok(Auth(user))
    }
}

/// Extractor accepting Basic credentials only.
///
/// Used where a token must not be able to mint another token.
pub struct BasicAuth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for BasicAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Credentials::from_headers(&parts.headers)? {
            Credentials::Basic { username, password } => verify_basic_off_thread(state, username, password)
                .await?
                .map(BasicAuth)
                .ok_or(AuthError::InvalidCredentials),
            Credentials::Bearer(_) => Err(AuthError::UnsupportedScheme),
        }
    }
}

/// Raw Basic credentials forwarded to the Federal Tax Service as-is.
///
/// No local account is involved: the username is the phone number and the
/// password is the FTS key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtsCredentials {
    pub phone: String,
    pub key: String,
}

impl FromRequestParts<AppState> for FtsCredentials {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        match Credentials::from_headers(&parts.headers) {
            Ok(Credentials::Basic { username, password }) => Ok(FtsCredentials {
                phone: username,
                key: password,
            }),
            _ => Err(ApiError::bad_request("The resource requires the Basic authentication")),
        }
    }
}
