// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing via bcrypt.

use std::sync::LazyLock;

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Checked against when the username is unknown, so a miss costs one
/// bcrypt verify like a wrong password does.
static DECOY_HASH: LazyLock<Option<String>> = LazyLock::new(|| hash_password("decoy").ok());

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Match a password against a stored hash.
///
/// A corrupt hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

/// Spend one bcrypt verify without a stored hash.
pub fn verify_decoy(password: &str) {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = bcrypt::verify(password, hash);
    }
}
