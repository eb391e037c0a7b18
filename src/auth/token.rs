// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying `{id, iat, exp}`. There is no revocation
//! list: a token stays valid until it expires or its user disappears.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, TokenClaims};
use crate::storage::{StorageResult, StoredUser, UserRepository};

/// Signs and verifies bearer tokens with the process secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            default_ttl,
        }
    }

    /// Lifetime used by `GET /token`.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `user_id` expiring `ttl` from now.
    pub fn issue(&self, user_id: u64, ttl: Duration) -> Result<String, AuthError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            id: user_id,
            iat,
            exp: iat.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token signing: {e}")))
    }

    /// Decode a token without touching storage.
    ///
    /// Malformed, tampered or expired tokens all yield `None`.
    pub fn decode_user_id(&self, token: &str) -> Option<u64> {
        match decode::<TokenClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims.id),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected");
                None
            }
        }
    }

    /// Resolve a token to its user.
    ///
    /// Returns `Ok(None)` for any invalid token or when the user no longer
    /// exists. Only storage failures surface as errors.
    pub fn verify(&self, token: &str, users: &UserRepository<'_>) -> StorageResult<Option<StoredUser>> {
        match self.decode_user_id(token) {
            Some(user_id) => users.find(user_id),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::temp_db;
    use crate::storage::NewUser;

    fn service() -> TokenService {
        TokenService::new(b"test-secret-key", Duration::from_secs(600))
    }

    fn tamper(token: &str, index: usize) -> String {
        token
            .char_indices()
            .map(|(i, c)| {
                if i != index {
                    c
                } else if c == 'A' {
                    'B'
                } else {
                    'A'
                }
            })
            .collect()
    }

    #[test]
    fn issued_token_decodes_to_its_user() {
        let tokens = service();
        let token = tokens.issue(42, Duration::from_secs(600)).unwrap();
        assert_eq!(tokens.decode_user_id(&token), Some(42));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = service().issue(42, Duration::from_secs(600)).unwrap();
        let other = TokenService::new(b"another-secret", Duration::from_secs(600));
        assert_eq!(other.decode_user_id(&token), None);
    }

    #[test]
    fn any_single_character_change_invalidates_token() {
        let tokens = service();
        let token = tokens.issue(7, Duration::from_secs(600)).unwrap();
        for index in 0..token.len() {
            let forged = tamper(&token, index);
            assert_eq!(tokens.decode_user_id(&forged), None, "forged at index {index}");
        }
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = service();
        assert_eq!(tokens.decode_user_id(""), None);
        assert_eq!(tokens.decode_user_id("not.a.token"), None);
    }

    #[tokio::test]
    async fn token_expires_after_ttl() {
        let tokens = service();
        let token = tokens.issue(1, Duration::from_secs(1)).unwrap();
        assert_eq!(tokens.decode_user_id(&token), Some(1));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(tokens.decode_user_id(&token), None);
    }

    #[test]
    fn verify_requires_existing_user() {
        let (db, _dir) = temp_db();
        let users = UserRepository::new(&db);
        let user = users
            .create(NewUser {
                username: "alice".into(),
                password_hash: "hash".into(),
                phone: "+79990000000".into(),
                fts_key: 123456,
            })
            .unwrap();

        let tokens = service();
        let token = tokens.issue(user.id, Duration::from_secs(600)).unwrap();
        assert_eq!(tokens.verify(&token, &users).unwrap(), Some(user.clone()));

        let orphan = tokens.issue(user.id + 100, Duration::from_secs(600)).unwrap();
        assert_eq!(tokens.verify(&orphan, &users).unwrap(), None);
    }
}
