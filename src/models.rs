// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Request fields are all
//! optional at the serde level and checked explicitly, so a missing field
//! produces a `400` naming the field rather than a generic decode error.
//!
//! ## Model Categories
//!
//! - **Users**: registration, profile updates and the public user view
//! - **Token**: bearer token issuance
//! - **FTS**: Federal Tax Service signup, credential check and receipts

use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::providers::{ReceiptIdentifier, ReceiptLineItem};
use crate::storage::StoredUser;

/// Unwrap a JSON body, turning decode failures into a `400`.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(format!("No {field} provided")))
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    required(value.filter(|v| !v.trim().is_empty()), field)
}

// =============================================================================
// User Models
// =============================================================================

/// Registration body; every field is required.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Login
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Phone number, also the FTS login
    pub phone: Option<String>,
    /// Federal Tax Service key from SMS
    pub fts_key: Option<u64>,
}

/// Registration body after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNewUser {
    pub username: String,
    pub password: String,
    pub phone: String,
    pub fts_key: u64,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<ValidatedNewUser, ApiError> {
        Ok(ValidatedNewUser {
            username: required_text(self.username, "username")?,
            password: required_text(self.password, "password")?,
            phone: required_text(self.phone, "phone")?,
            fts_key: required(self.fts_key, "fts_key")?,
        })
    }
}

/// Profile update body; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    /// New login
    pub username: Option<String>,
    /// New password
    pub password: Option<String>,
    /// New phone number
    pub phone: Option<String>,
    /// New Federal Tax Service key
    pub fts_key: Option<u64>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserResponse {
    pub id: u64,
    pub username: String,
    pub phone: String,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            phone: user.phone,
        }
    }
}

/// `{"user": {...}}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

impl From<StoredUser> for UserEnvelope {
    fn from(user: StoredUser) -> Self {
        Self { user: user.into() }
    }
}

// =============================================================================
// Token Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Bearer token
    pub token: String,
}

// =============================================================================
// FTS Models
// =============================================================================

/// Federal Tax Service signup body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FtsUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Phone number in `+7...` form
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFtsUser {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl FtsUserRequest {
    pub fn validate(self) -> Result<ValidatedFtsUser, ApiError> {
        Ok(ValidatedFtsUser {
            name: required_text(self.name, "name")?,
            email: required_text(self.email, "email")?,
            phone: required_text(self.phone, "phone")?,
        })
    }
}

/// Result of a Federal Tax Service credential check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckResponse {
    /// Whether the FTS accepted the phone/key pair
    pub check: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Receipt lookup query: `?fn=..&fd=..&fp=..`.
///
/// Values are kept as text so that a malformed number yields the same
/// message as a missing one.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReceiptQuery {
    /// Fiscal drive number (ФН)
    #[serde(rename = "fn")]
    pub fn_number: Option<String>,
    /// Fiscal document number (ФД)
    pub fd: Option<String>,
    /// Fiscal sign (ФП)
    pub fp: Option<String>,
}

impl ReceiptQuery {
    pub fn identifier(&self) -> Result<ReceiptIdentifier, ApiError> {
        let number = |value: &Option<String>, field: &str| {
            required(value.as_deref().and_then(|v| v.trim().parse::<u64>().ok()), field)
        };
        Ok(ReceiptIdentifier {
            fn_number: number(&self.fn_number, "fn")?,
            fd: number(&self.fd, "fd")?,
            fp: number(&self.fp, "fp")?,
        })
    }
}

/// Normalized receipt positions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemsResponse {
    pub items: Vec<ReceiptLineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn create_user_reports_first_missing_field() {
        let err = CreateUserRequest::default().validate().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No username provided");

        let err = CreateUserRequest {
            username: Some("alice".into()),
            password: Some("pw".into()),
            phone: Some("+79990000000".into()),
            fts_key: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "No fts_key provided");
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let err = CreateUserRequest {
            username: Some("alice".into()),
            password: Some("   ".into()),
            phone: Some("+79990000000".into()),
            fts_key: Some(1),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "No password provided");
    }

    #[test]
    fn receipt_query_requires_numeric_parts() {
        let query = ReceiptQuery {
            fn_number: Some("9288000100115785".into()),
            fd: Some("4321".into()),
            fp: Some("1234567890".into()),
        };
        assert_eq!(
            query.identifier().unwrap(),
            ReceiptIdentifier {
                fn_number: 9288000100115785,
                fd: 4321,
                fp: 1234567890
            }
        );

        let missing = ReceiptQuery {
            fd: None,
            ..query.clone()
        };
        assert_eq!(missing.identifier().unwrap_err().message, "No fd provided");

        let garbage = ReceiptQuery {
            fp: Some("12ab".into()),
            ..query
        };
        assert_eq!(garbage.identifier().unwrap_err().message, "No fp provided");
    }

    #[test]
    fn fts_user_request_validation() {
        let err = FtsUserRequest {
            name: Some("Alice".into()),
            email: None,
            phone: Some("+7".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message, "No email provided");
    }

    #[test]
    fn user_response_hides_secrets() {
        let now = chrono::Utc::now();
        let envelope: UserEnvelope = StoredUser {
            id: 3,
            username: "carol".into(),
            password_hash: "$2b$10$hash".into(),
            phone: "+79995550000".into(),
            fts_key: 42,
            created_at: now,
            updated_at: now,
        }
        .into();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user": {"id": 3, "username": "carol", "phone": "+79995550000"}})
        );
    }
}
