// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database handle and shared table definitions.

use std::path::Path;

use redb::{ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
pub(crate) const USERNAMES: TableDefinition<&str, u64> = TableDefinition::new("usernames");
pub(crate) const TABLES: TableDefinition<u64, &[u8]> = TableDefinition::new("tables");
pub(crate) const TABLE_KEYS: TableDefinition<&str, u64> = TableDefinition::new("table_keys");
pub(crate) const PRODUCTS: TableDefinition<u64, &[u8]> = TableDefinition::new("products");
pub(crate) const USER_TABLES: TableDefinition<u64, &[u8]> = TableDefinition::new("user_tables");
pub(crate) const USER_TABLE_ARCHIVE: TableDefinition<u64, &[u8]> =
    TableDefinition::new("user_table_archive");
pub(crate) const USER_PRODUCTS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("user_products");

/// Sequence name → last issued id.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database shared by all repositories.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(USERS)?;
            write_txn.open_table(USERNAMES)?;
            write_txn.open_table(TABLES)?;
            write_txn.open_table(TABLE_KEYS)?;
            write_txn.open_table(PRODUCTS)?;
            write_txn.open_table(USER_TABLES)?;
            write_txn.open_table(USER_TABLE_ARCHIVE)?;
            write_txn.open_table(USER_PRODUCTS)?;
            write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Cheap liveness probe used by the readiness endpoint.
    pub fn ping(&self) -> StorageResult<()> {
        let read_txn = self.begin_read()?;
        read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}

// =============================================================================
// Helpers shared by repositories
// =============================================================================

/// Reserve the next id of the named sequence inside `txn`.
///
/// Ids start at 1. Aborting `txn` rolls the reservation back.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map_or(0, |v| v.value()) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// Read and deserialize the JSON record stored under `id`.
pub(crate) fn get_json<T, R>(table: &R, id: u64) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Deserialize every record of a JSON table, in id order.
pub(crate) fn all_json<T, R>(table: &R) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<u64, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

pub(crate) fn to_json<T: Serialize>(record: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

#[cfg(test)]
pub(crate) fn temp_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("test.redb")).unwrap();
    (db, dir)
}
