// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Receipt Analyzer - shared bill backend
//!
//! This crate authenticates users, proxies receipt lookups to the Russian
//! Federal Tax Service (FTS) and stores the tables, products and per-user
//! assignments used to split a shared bill.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Basic and bearer authentication
//! - `providers` - Federal Tax Service client
//! - `storage` - Embedded redb persistence

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
