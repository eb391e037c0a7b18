// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{
    auth::{password::hash_password, Auth},
    error::ApiError,
    models::{json_body, CreateUserRequest, UpdateUserRequest, UserEnvelope},
    state::AppState,
    storage::{NewUser, UserChanges, UserRepository},
};

/// Reject a phone/key pair the Federal Tax Service does not accept.
async fn ensure_fts_access(state: &AppState, phone: &str, fts_key: u64) -> Result<(), ApiError> {
    if state.fts.check_credentials(phone, &fts_key.to_string()).await? {
        Ok(())
    } else {
        Err(ApiError::not_found(
            "Can't authorize in Federal Tax Service with given phone/key",
        ))
    }
}

/// Register a new user.
///
/// The phone/key pair is verified against the Federal Tax Service first.
#[utoipa::path(
    post,
    path = "/api/v1.0/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserEnvelope),
        (status = 400, description = "No username/password/phone/fts_key provided"),
        (status = 404, description = "Can't authorize in Federal Tax Service with given phone/key"),
        (status = 409, description = "Username already exist")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let input = json_body(body)?.validate()?;
    ensure_fts_access(&state, &input.phone, input.fts_key).await?;

    let user = UserRepository::new(&state.db).create(NewUser {
        username: input.username,
        password_hash: hash_password(&input.password)?,
        phone: input.phone,
        fts_key: input.fts_key,
    })?;

    info!(user_id = user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get a user's public profile by id.
#[utoipa::path(
    get,
    path = "/api/v1.0/users/{id}",
    tag = "Users",
    params(("id" = u64, Path, description = "User id")),
    security(("basic" = []), ("bearer" = [])),
    responses(
        (status = 200, description = "User found", body = UserEnvelope),
        (status = 401, description = "Unauthorized access"),
        (status = 404, description = "User id doesn't exist")
    )
)]
pub async fn get_user(
    Auth(_caller): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let not_found = || ApiError::not_found(format!("User id {id} doesn't exist"));
    let user_id: u64 = id.parse().map_err(|_| not_found())?;

    let user = UserRepository::new(&state.db)
        .find(user_id)?
        .ok_or_else(not_found)?;
    Ok(Json(user.into()))
}

/// Get the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/v1.0/users/me",
    tag = "Users",
    security(("basic" = []), ("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserEnvelope),
        (status = 401, description = "Unauthorized access")
    )
)]
pub async fn get_me(Auth(caller): Auth, State(state): State<AppState>) -> Result<Json<UserEnvelope>, ApiError> {
    let user = UserRepository::new(&state.db).get(caller.user_id)?;
    Ok(Json(user.into()))
}

/// Update the authenticated user's profile.
///
/// Only the supplied fields change. The resulting phone/key pair must still
/// be accepted by the Federal Tax Service.
#[utoipa::path(
    put,
    path = "/api/v1.0/users/me",
    tag = "Users",
    request_body = UpdateUserRequest,
    security(("basic" = []), ("bearer" = [])),
    responses(
        (status = 200, description = "User updated", body = UserEnvelope),
        (status = 400, description = "Malformed JSON body"),
        (status = 401, description = "Unauthorized access"),
        (status = 404, description = "Can't authorize in Federal Tax Service with given phone/key"),
        (status = 409, description = "Username already exist")
    )
)]
pub async fn update_me(
    Auth(caller): Auth,
    State(state): State<AppState>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let input = json_body(body)?;
    let changes = UserChanges {
        username: input.username.filter(|u| !u.trim().is_empty()),
        password_hash: input
            .password
            .filter(|p| !p.is_empty())
            .map(|p| hash_password(&p))
            .transpose()?,
        phone: input.phone.filter(|p| !p.trim().is_empty()),
        fts_key: input.fts_key,
    };

    let users = UserRepository::new(&state.db);
    let current = users.get(caller.user_id)?;
    let phone = changes.phone.as_deref().unwrap_or(&current.phone);
    let fts_key = changes.fts_key.unwrap_or(current.fts_key);
    ensure_fts_access(&state, phone, fts_key).await?;

    let user = users.apply(caller.user_id, changes)?;

    info!(user_id = user.id, "User profile updated");
    Ok(Json(user.into()))
}
