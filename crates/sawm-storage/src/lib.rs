// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Sawm reminder engine.
//!
//! Provides WAL-mode SQLite storage with embedded refinery migrations, async
//! access via `tokio-rusqlite`, and typed operations for the session store,
//! the reminder dedup ledger, the durable job queue, notification records
//! and device tokens.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::{Database, DatabaseOptions};
pub use models::*;
