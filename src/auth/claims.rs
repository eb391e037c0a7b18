// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and authenticated user representation.

use serde::{Deserialize, Serialize};

use crate::storage::StoredUser;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// User id
    pub id: u64,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Absolute expiry (Unix seconds)
    pub exp: i64,
}

/// How the caller proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Basic,
    Bearer,
}

/// Identity resolved by the auth gateway for a single request.
///
/// Handlers receive it as an argument; it is never stored beyond the
/// request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub username: String,
    /// Federal Tax Service login
    pub phone: String,
    /// Federal Tax Service key
    pub fts_key: u64,
    pub method: AuthMethod,
}

impl AuthenticatedUser {
    pub fn from_stored(user: StoredUser, method: AuthMethod) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            phone: user.phone,
            fts_key: user.fts_key,
            method,
        }
    }
}
