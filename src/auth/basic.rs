// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `Authorization` header parsing.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};

use super::AuthError;

/// Credentials presented in an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
}

impl Credentials {
    /// Parse the `Authorization` header of a request.
    ///
    /// Scheme names are matched case-insensitively.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;
        Self::parse(value)
    }

    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let (scheme, rest) = value.trim().split_once(' ').ok_or(AuthError::InvalidAuthHeader)?;
        let rest = rest.trim();

        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = Base64::decode_vec(rest).map_err(|_| AuthError::InvalidAuthHeader)?;
            let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidAuthHeader)?;
            let (username, password) = decoded.split_once(':').ok_or(AuthError::InvalidAuthHeader)?;
            Ok(Credentials::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        } else if scheme.eq_ignore_ascii_case("bearer") {
            if rest.is_empty() {
                return Err(AuthError::InvalidAuthHeader);
            }
            Ok(Credentials::Bearer(rest.to_string()))
        } else {
            Err(AuthError::UnsupportedScheme)
        }
    }
}
