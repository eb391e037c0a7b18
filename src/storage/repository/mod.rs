// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded database.
//!
//! Each repository provides operations for one aggregate, using the
//! [`Database`](super::Database) for all transactions.

pub mod tables;
pub mod users;

pub use tables::{StoredProduct, StoredTable, TableRepository, UserProduct, UserTableLink};
pub use users::{NewUser, StoredUser, UserChanges, UserRepository};
