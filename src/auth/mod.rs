// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Authentication gateway for the Receipt Analyzer API.
//!
//! ## Auth Flow
//!
//! 1. Client obtains credentials by registering (`POST /users`)
//! 2. Client calls protected endpoints with either
//!    - `Authorization: Basic base64(username:password)`, or
//!    - `Authorization: Bearer <token>` obtained from `GET /token`
//! 3. Server:
//!    - verifies the password against the stored bcrypt hash, or
//!    - verifies the token signature and expiry, then checks the user
//!      still exists
//!    - hands the resolved [`AuthenticatedUser`] to the handler
//!
//! ## Security
//!
//! - Every rejection produces the same 401 body, whichever strategy failed
//! - Tokens are HS256 JWTs signed with the process secret, no clock leeway
//! - Passwords are stored as bcrypt hashes only

pub mod basic;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod token;

pub use basic::Credentials;
pub use claims::{AuthMethod, AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{verify_basic, verify_token, Auth, BasicAuth, FtsCredentials};
pub use token::TokenService;
