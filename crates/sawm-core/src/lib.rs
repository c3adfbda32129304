// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sawm prayer-time reminder engine.
//!
//! This crate provides the domain types, error taxonomy, injectable clock and
//! adapter traits shared by the storage, push and dispatch crates.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SawmError;
pub use types::{AdapterType, FastId, FastStatus, HealthStatus, LedgerInsert, UserId};

pub use traits::{PluginAdapter, PushAdapter, PushTransport, StorageAdapter};
