// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::providers::{FtsClient, FtsError};
use crate::storage::Database;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: TokenService,
    pub fts: FtsClient,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenService, fts: FtsClient) -> Self {
        Self {
            db: Arc::new(db),
            tokens,
            fts,
        }
    }

    /// Wire the token service and FTS client from configuration.
    pub fn from_config(db: Database, config: &AppConfig) -> Result<Self, FtsError> {
        let tokens = TokenService::new(config.secret_key.as_bytes(), config.token_ttl);
        let fts = FtsClient::new(&config.fts_base_url, config.fts_timeout)?;
        Ok(Self::new(db, tokens, fts))
    }

    /// State backed by a throwaway database, talking to `fts_base_url`.
    #[cfg(test)]
    pub(crate) fn for_tests(fts_base_url: &str) -> (Self, tempfile::TempDir) {
        let (db, dir) = crate::storage::database::temp_db();
        let tokens = TokenService::new(b"test-secret", std::time::Duration::from_secs(600));
        let fts = FtsClient::new(fts_base_url, std::time::Duration::from_secs(5)).unwrap();
        (Self::new(db, tokens, fts), dir)
    }
}
