// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clients for external services.

pub mod fts;

pub use fts::{FtsClient, FtsError, ReceiptIdentifier, ReceiptLineItem};
