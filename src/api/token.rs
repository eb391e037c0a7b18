// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{auth::BasicAuth, error::ApiError, models::TokenResponse, state::AppState};

/// Issue a bearer token for the caller.
///
/// Requires Basic credentials; an existing token cannot be used to mint
/// a new one.
#[utoipa::path(
    get,
    path = "/api/v1.0/token",
    tag = "Token",
    security(("basic" = [])),
    responses(
        (status = 200, description = "Bearer token", body = TokenResponse),
        (status = 401, description = "Unauthorized access")
    )
)]
pub async fn get_token(
    BasicAuth(caller): BasicAuth,
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.tokens.issue(caller.user_id, state.tokens.default_ttl())?;
    Ok(Json(TokenResponse { token }))
}
