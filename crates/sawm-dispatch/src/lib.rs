// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder dispatch for the Sawm engine.
//!
//! The [`Scheduler`] ticks once per minute: it advances fast lifecycles,
//! selects the sessions whose prayer times match the tick's `HH:MM` slot and
//! enqueues one job each. The [`WorkerPool`] consumes those jobs through a
//! [`ReminderWorker`], which dedups on the reminder ledger so a slot is
//! delivered at most once no matter how often it is enqueued.

pub mod lifecycle;
pub mod scheduler;
pub mod selector;
pub mod shutdown;
pub mod tokens;
pub mod worker;

pub use lifecycle::{LifecycleReport, LifecycleUpdater};
pub use scheduler::{Scheduler, TickReport};
pub use selector::select_candidates;
pub use tokens::TokenHealthManager;
pub use worker::{JobOutcome, PollOutcome, PushSummary, ReminderWorker, WorkerPool};
