// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Federal Tax Service proxy endpoints.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use crate::{
    auth::{Auth, FtsCredentials},
    error::ApiError,
    models::{json_body, CheckResponse, FtsUserRequest, ItemsResponse, MessageResponse, ReceiptQuery},
    state::AppState,
};

/// Register a phone with the Federal Tax Service.
///
/// The FTS answers by sending the key in an SMS. An already registered
/// phone gets the key resent instead.
#[utoipa::path(
    post,
    path = "/api/v1.0/fts/users",
    tag = "FTS",
    request_body = FtsUserRequest,
    responses(
        (status = 200, description = "SMS sent", body = MessageResponse),
        (status = 400, description = "No name/email/phone provided, or rejected by the FTS")
    )
)]
pub async fn create_fts_user(
    State(state): State<AppState>,
    body: Result<Json<FtsUserRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let input = json_body(body)?.validate()?;

    match state.fts.register_user(&input.name, &input.email, &input.phone).await {
        Ok(()) => {}
        Err(err) if err.is_user_exists() => {
            info!(phone = %input.phone, "Phone already registered with FTS, restoring key");
            if let Err(err) = state.fts.restore_password(&input.phone).await {
                warn!(phone = %input.phone, error = %err, "FTS key restore failed");
            }
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Json(MessageResponse {
        message: format!("SMS with password was sent to {}", input.phone),
    }))
}

/// Check a phone/key pair against the Federal Tax Service.
///
/// The pair is sent as Basic credentials and forwarded unchanged.
#[utoipa::path(
    get,
    path = "/api/v1.0/fts/users",
    tag = "FTS",
    security(("basic" = [])),
    responses(
        (status = 200, description = "Credentials accepted", body = CheckResponse),
        (status = 400, description = "The resource requires the Basic authentication"),
        (status = 404, description = "Credentials rejected", body = CheckResponse)
    )
)]
pub async fn check_fts_user(
    credentials: FtsCredentials,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CheckResponse>), ApiError> {
    let check = state
        .fts
        .check_credentials(&credentials.phone, &credentials.key)
        .await?;
    let status = if check { StatusCode::OK } else { StatusCode::NOT_FOUND };
    Ok((status, Json(CheckResponse { check })))
}

/// Fetch a receipt by its fiscal identifiers using the caller's FTS login.
#[utoipa::path(
    get,
    path = "/api/v1.0/fts/receipts",
    tag = "FTS",
    params(ReceiptQuery),
    security(("basic" = []), ("bearer" = [])),
    responses(
        (status = 200, description = "Normalized receipt positions", body = ItemsResponse),
        (status = 400, description = "No fn/fd/fp provided"),
        (status = 401, description = "Unauthorized access"),
        (status = 403, description = "The user was not found or the specified password was not correct"),
        (status = 406, description = "The ticket was not found"),
        (status = 408, description = "Empty JSON response")
    )
)]
pub async fn get_receipt(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Query(query): Query<ReceiptQuery>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let id = query.identifier()?;
    let items = state
        .fts
        .fetch_receipt(id, &caller.phone, &caller.fts_key.to_string())
        .await?;

    info!(user_id = caller.user_id, fn_number = id.fn_number, fd = id.fd, items = items.len(), "Receipt fetched");
    Ok(Json(ItemsResponse { items }))
}
