// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared-bill repository: tables, their products and per-user assignments.
//!
//! A *table* groups the people splitting one receipt. Each user sits at no
//! more than one live table at a time (`user_tables` is keyed by user id).
//! Settling a user moves their link into `user_table_archive`, which is never
//! touched by deletes so history survives.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::storage::database::{
    all_json, get_json, next_id, to_json, Database, StorageError, StorageResult, PRODUCTS,
    TABLES, TABLE_KEYS, USERS, USER_PRODUCTS, USER_TABLES, USER_TABLE_ARCHIVE,
};

const TABLE_SEQUENCE: &str = "tables";
const PRODUCT_SEQUENCE: &str = "products";
const USER_PRODUCT_SEQUENCE: &str = "user_products";
const ARCHIVE_SEQUENCE: &str = "user_table_archive";

/// A shared bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredTable {
    pub id: u64,
    /// Unique key participants use to join
    pub table_key: String,
    #[serde(default)]
    pub table_info: String,
    pub table_date: DateTime<Utc>,
}

/// A receipt line item placed on a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredProduct {
    pub id: u64,
    pub table_id: u64,
    pub product_name: String,
    pub count: i64,
    pub price: f64,
}

/// Link between a user and the table they sit at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTableLink {
    /// Archive id; zero for live links
    #[serde(default)]
    pub id: u64,
    pub user_id: u64,
    pub table_id: u64,
    /// Amount the user owes for this table
    pub price: f64,
}

/// Portion of a product assigned to a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProduct {
    pub id: u64,
    pub user_id: u64,
    pub product_id: u64,
    pub table_id: u64,
    pub count: f64,
    pub price: f64,
}

/// Repository for shared-bill operations.
pub struct TableRepository<'a> {
    db: &'a Database,
}

impl<'a> TableRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Create a table with a unique key.
    pub fn create_table(&self, table_key: &str, table_info: &str) -> StorageResult<StoredTable> {
        let write_txn = self.db.begin_write()?;

        let taken = write_txn.open_table(TABLE_KEYS)?.get(table_key)?.is_some();
        if taken {
            write_txn.abort()?;
            return Err(StorageError::AlreadyExists(format!("Table key '{table_key}'")));
        }

        let table = StoredTable {
            id: next_id(&write_txn, TABLE_SEQUENCE)?,
            table_key: table_key.to_string(),
            table_info: table_info.to_string(),
            table_date: Utc::now(),
        };
        {
            let mut tables = write_txn.open_table(TABLES)?;
            tables.insert(table.id, to_json(&table)?.as_slice())?;
            let mut keys = write_txn.open_table(TABLE_KEYS)?;
            keys.insert(table_key, table.id)?;
        }
        write_txn.commit()?;
        Ok(table)
    }

    pub fn get_table(&self, table_id: u64) -> StorageResult<StoredTable> {
        let read_txn = self.db.begin_read()?;
        let tables = read_txn.open_table(TABLES)?;
        get_json(&tables, table_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Table {table_id}")))
    }

    pub fn find_table_by_key(&self, table_key: &str) -> StorageResult<Option<StoredTable>> {
        let read_txn = self.db.begin_read()?;
        let keys = read_txn.open_table(TABLE_KEYS)?;
        let Some(table_id) = keys.get(table_key)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let tables = read_txn.open_table(TABLES)?;
        get_json(&tables, table_id)
    }

    /// Delete a table together with everything that hangs off it.
    ///
    /// Removes the table and its key, its products, every user-product
    /// assignment for the table and every live user-table link. Archived
    /// links are kept.
    pub fn delete_table_cascade(&self, table_id: u64) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;

        let table: Option<StoredTable> = get_json(&write_txn.open_table(TABLES)?, table_id)?;
        let Some(table) = table else {
            write_txn.abort()?;
            return Err(StorageError::NotFound(format!("Table {table_id}")));
        };

        let products: Vec<StoredProduct> = all_json(&write_txn.open_table(PRODUCTS)?)?;
        let assignments: Vec<UserProduct> = all_json(&write_txn.open_table(USER_PRODUCTS)?)?;
        let links: Vec<UserTableLink> = all_json(&write_txn.open_table(USER_TABLES)?)?;

        let product_ids: Vec<u64> = products
            .iter()
            .filter(|p| p.table_id == table_id)
            .map(|p| p.id)
            .collect();

        {
            let mut product_table = write_txn.open_table(PRODUCTS)?;
            for id in &product_ids {
                product_table.remove(*id)?;
            }

            let mut assignment_table = write_txn.open_table(USER_PRODUCTS)?;
            for assignment in assignments
                .iter()
                .filter(|a| a.table_id == table_id || product_ids.contains(&a.product_id))
            {
                assignment_table.remove(assignment.id)?;
            }

            let mut link_table = write_txn.open_table(USER_TABLES)?;
            for link in links.iter().filter(|l| l.table_id == table_id) {
                link_table.remove(link.user_id)?;
            }

            write_txn.open_table(TABLE_KEYS)?.remove(table.table_key.as_str())?;
            write_txn.open_table(TABLES)?.remove(table_id)?;
        }
        write_txn.commit()?;

        tracing::info!(
            table_id,
            products = product_ids.len(),
            "Table deleted with dependent records"
        );
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub fn add_product(
        &self,
        table_id: u64,
        product_name: &str,
        count: i64,
        price: f64,
    ) -> StorageResult<StoredProduct> {
        let write_txn = self.db.begin_write()?;
        require_table(&write_txn, table_id)?;

        let product = StoredProduct {
            id: next_id(&write_txn, PRODUCT_SEQUENCE)?,
            table_id,
            product_name: product_name.to_string(),
            count,
            price,
        };
        write_txn
            .open_table(PRODUCTS)?
            .insert(product.id, to_json(&product)?.as_slice())?;
        write_txn.commit()?;
        Ok(product)
    }

    pub fn list_products(&self, table_id: u64) -> StorageResult<Vec<StoredProduct>> {
        let read_txn = self.db.begin_read()?;
        let products: Vec<StoredProduct> = all_json(&read_txn.open_table(PRODUCTS)?)?;
        Ok(products.into_iter().filter(|p| p.table_id == table_id).collect())
    }

    // =========================================================================
    // User ↔ table links
    // =========================================================================

    /// Seat a user at a table.
    ///
    /// A user already seated elsewhere must be settled first.
    pub fn join_table(&self, user_id: u64, table_id: u64) -> StorageResult<UserTableLink> {
        let write_txn = self.db.begin_write()?;
        require_user(&write_txn, user_id)?;
        require_table(&write_txn, table_id)?;

        let seated = write_txn.open_table(USER_TABLES)?.get(user_id)?.is_some();
        if seated {
            write_txn.abort()?;
            return Err(StorageError::AlreadyExists(format!(
                "User {user_id} table membership"
            )));
        }

        let link = UserTableLink {
            id: 0,
            user_id,
            table_id,
            price: 0.0,
        };
        write_txn
            .open_table(USER_TABLES)?
            .insert(user_id, to_json(&link)?.as_slice())?;
        write_txn.commit()?;
        Ok(link)
    }

    /// The live table link of a user, if seated.
    pub fn current_link(&self, user_id: u64) -> StorageResult<Option<UserTableLink>> {
        let read_txn = self.db.begin_read()?;
        let links = read_txn.open_table(USER_TABLES)?;
        get_json(&links, user_id)
    }

    pub fn table_members(&self, table_id: u64) -> StorageResult<Vec<UserTableLink>> {
        let read_txn = self.db.begin_read()?;
        let links: Vec<UserTableLink> = all_json(&read_txn.open_table(USER_TABLES)?)?;
        Ok(links.into_iter().filter(|l| l.table_id == table_id).collect())
    }

    /// Record the amount a seated user owes.
    pub fn set_owed_price(&self, user_id: u64, price: f64) -> StorageResult<UserTableLink> {
        let write_txn = self.db.begin_write()?;
        let link: Option<UserTableLink> = get_json(&write_txn.open_table(USER_TABLES)?, user_id)?;
        let Some(mut link) = link else {
            write_txn.abort()?;
            return Err(StorageError::NotFound(format!("User {user_id} table membership")));
        };

        link.price = price;
        write_txn
            .open_table(USER_TABLES)?
            .insert(user_id, to_json(&link)?.as_slice())?;
        write_txn.commit()?;
        Ok(link)
    }

    /// Settle a user: archive the live link and free the seat.
    pub fn settle_user(&self, user_id: u64) -> StorageResult<UserTableLink> {
        let write_txn = self.db.begin_write()?;
        let link: Option<UserTableLink> = get_json(&write_txn.open_table(USER_TABLES)?, user_id)?;
        let Some(mut link) = link else {
            write_txn.abort()?;
            return Err(StorageError::NotFound(format!("User {user_id} table membership")));
        };

        link.id = next_id(&write_txn, ARCHIVE_SEQUENCE)?;
        write_txn
            .open_table(USER_TABLE_ARCHIVE)?
            .insert(link.id, to_json(&link)?.as_slice())?;
        write_txn.open_table(USER_TABLES)?.remove(user_id)?;
        write_txn.commit()?;
        Ok(link)
    }

    /// Settled links of a user, oldest first.
    pub fn archived_links(&self, user_id: u64) -> StorageResult<Vec<UserTableLink>> {
        let read_txn = self.db.begin_read()?;
        let links: Vec<UserTableLink> = all_json(&read_txn.open_table(USER_TABLE_ARCHIVE)?)?;
        Ok(links.into_iter().filter(|l| l.user_id == user_id).collect())
    }

    // =========================================================================
    // User ↔ product assignments
    // =========================================================================

    /// Assign a portion of a product to a user.
    pub fn assign_product(
        &self,
        user_id: u64,
        product_id: u64,
        count: f64,
        price: f64,
    ) -> StorageResult<UserProduct> {
        let write_txn = self.db.begin_write()?;
        require_user(&write_txn, user_id)?;
        let product: Option<StoredProduct> =
            get_json(&write_txn.open_table(PRODUCTS)?, product_id)?;
        let Some(product) = product else {
            write_txn.abort()?;
            return Err(StorageError::NotFound(format!("Product {product_id}")));
        };

        let assignment = UserProduct {
            id: next_id(&write_txn, USER_PRODUCT_SEQUENCE)?,
            user_id,
            product_id,
            table_id: product.table_id,
            count,
            price,
        };
        write_txn
            .open_table(USER_PRODUCTS)?
            .insert(assignment.id, to_json(&assignment)?.as_slice())?;
        write_txn.commit()?;
        Ok(assignment)
    }

    pub fn user_products(&self, user_id: u64, table_id: u64) -> StorageResult<Vec<UserProduct>> {
        let read_txn = self.db.begin_read()?;
        let assignments: Vec<UserProduct> = all_json(&read_txn.open_table(USER_PRODUCTS)?)?;
        Ok(assignments
            .into_iter()
            .filter(|a| a.user_id == user_id && a.table_id == table_id)
            .collect())
    }
}

fn require_table(txn: &WriteTransaction, table_id: u64) -> StorageResult<()> {
    if txn.open_table(TABLES)?.get(table_id)?.is_none() {
        return Err(StorageError::NotFound(format!("Table {table_id}")));
    }
    Ok(())
}

fn require_user(txn: &WriteTransaction, user_id: u64) -> StorageResult<()> {
    if txn.open_table(USERS)?.get(user_id)?.is_none() {
        return Err(StorageError::NotFound(format!("User id {user_id}")));
    }
    Ok(())
}
