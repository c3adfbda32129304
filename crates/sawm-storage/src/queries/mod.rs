// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the stored entities.

pub mod ledger;
pub mod notifications;
pub mod queue;
pub mod sessions;
pub mod tokens;
