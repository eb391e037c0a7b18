// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for credentials and shared bills, backed by an
//! embedded **redb** database (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! ```text
//! users               id → User (JSON)
//! usernames           username → id            (unique index)
//! tables              id → Table (JSON)
//! table_keys          table_key → id           (unique index)
//! products            id → Product (JSON)
//! user_tables         user_id → UserTable (JSON, one live table per user)
//! user_table_archive  id → UserTable (JSON, settled history)
//! user_products       id → UserProduct (JSON)
//! sequences           name → last issued id
//! ```
//!
//! ## Consistency
//!
//! Every mutating repository call runs inside a single write transaction.
//! Uniqueness violations abort the transaction before an
//! [`StorageError::AlreadyExists`] is returned, so the database is left
//! exactly as it was.

pub mod database;
pub mod repository;

pub use database::{Database, StorageError, StorageResult};
pub use repository::{
    NewUser, StoredProduct, StoredTable, StoredUser, TableRepository, UserChanges, UserProduct,
    UserRepository, UserTableLink,
};
