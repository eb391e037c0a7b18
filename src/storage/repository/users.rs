// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository (the credential store).
//!
//! Users are keyed by a numeric id; the `usernames` table is a unique index
//! from username to id maintained in the same write transaction.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::storage::database::{
    get_json, next_id, to_json, Database, StorageError, StorageResult, USERNAMES, USERS,
};

const USER_SEQUENCE: &str = "users";

/// User record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: u64,
    /// Unique login
    pub username: String,
    /// bcrypt hash, never the plaintext password
    pub password_hash: String,
    /// Phone number used as the Federal Tax Service login
    pub phone: String,
    /// Federal Tax Service key received by SMS
    pub fts_key: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub phone: String,
    pub fts_key: u64,
}

/// Field-level changes to a user; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub fts_key: Option<u64>,
}

fn username_taken(username: &str) -> StorageError {
    StorageError::AlreadyExists(format!("Username '{username}'"))
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Look up a user by id.
    pub fn find(&self, user_id: u64) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        get_json(&table, user_id)
    }

    /// Get a user by id, failing with `NotFound` if absent.
    pub fn get(&self, user_id: u64) -> StorageResult<StoredUser> {
        self.find(user_id)?
            .ok_or_else(|| StorageError::NotFound(format!("User id {user_id}")))
    }

    /// Look up a user by username.
    pub fn find_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let names = read_txn.open_table(USERNAMES)?;
        let Some(user_id) = names.get(username)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        get_json(&users, user_id)
    }

    /// Create a new user.
    ///
    /// Fails with `AlreadyExists` when the username is taken; the write
    /// transaction is aborted first so nothing is changed.
    pub fn create(&self, new_user: NewUser) -> StorageResult<StoredUser> {
        let write_txn = self.db.begin_write()?;

        let taken = write_txn
            .open_table(USERNAMES)?
            .get(new_user.username.as_str())?
            .is_some();
        if taken {
            write_txn.abort()?;
            return Err(username_taken(&new_user.username));
        }

        let id = next_id(&write_txn, USER_SEQUENCE)?;
        let now = Utc::now();
        let user = StoredUser {
            id,
            username: new_user.username,
            password_hash: new_user.password_hash,
            phone: new_user.phone,
            fts_key: new_user.fts_key,
            created_at: now,
            updated_at: now,
        };

        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(id, to_json(&user)?.as_slice())?;
            let mut names = write_txn.open_table(USERNAMES)?;
            names.insert(user.username.as_str(), id)?;
        }
        write_txn.commit()?;

        tracing::info!(user_id = id, username = %user.username, "User created");
        Ok(user)
    }

    /// Apply field-level changes to an existing user.
    ///
    /// The stored record is re-read inside the write transaction, so fields
    /// absent from `changes` keep whatever a concurrent writer committed. A
    /// changed username moves the unique index entry; renaming onto a taken
    /// username aborts the transaction and fails with `AlreadyExists`.
    pub fn apply(&self, user_id: u64, changes: UserChanges) -> StorageResult<StoredUser> {
        let write_txn = self.db.begin_write()?;

        let existing: Option<StoredUser> = get_json(&write_txn.open_table(USERS)?, user_id)?;
        let existing = existing.ok_or_else(|| StorageError::NotFound(format!("User id {user_id}")))?;

        if let Some(username) = changes.username.as_deref().filter(|u| *u != existing.username) {
            let taken = write_txn.open_table(USERNAMES)?.get(username)?.is_some();
            if taken {
                write_txn.abort()?;
                return Err(username_taken(username));
            }
            let mut names = write_txn.open_table(USERNAMES)?;
            names.remove(existing.username.as_str())?;
            names.insert(username, user_id)?;
        }

        let updated = StoredUser {
            id: existing.id,
            username: changes.username.unwrap_or(existing.username),
            password_hash: changes.password_hash.unwrap_or(existing.password_hash),
            phone: changes.phone.unwrap_or(existing.phone),
            fts_key: changes.fts_key.unwrap_or(existing.fts_key),
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(user_id, to_json(&updated)?.as_slice())?;
        }
        write_txn.commit()?;

        Ok(updated)
    }
}
