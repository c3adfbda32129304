// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fast lifecycle updater.
//!
//! Two set-based transitions per tick, in order: `upcoming -> active` then
//! `active -> completed`. Each is a single predicate-guarded UPDATE in the
//! store, so replaying a tick is a no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sawm_core::{SawmError, StorageAdapter};
use tracing::debug;

/// Rows changed by one lifecycle pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    pub activated: u64,
    pub completed: u64,
}

pub struct LifecycleUpdater {
    storage: Arc<dyn StorageAdapter>,
}

impl LifecycleUpdater {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Apply both transitions for `now`.
    ///
    /// A storage error aborts the pass and is returned unchanged; the caller
    /// must not go on to select reminders against a half-updated store.
    pub async fn advance(&self, now: DateTime<Utc>) -> Result<LifecycleReport, SawmError> {
        let activated = self.storage.activate_due_sessions(now).await?;
        let completed = self.storage.complete_due_sessions(now).await?;
        if activated > 0 || completed > 0 {
            debug!(activated, completed, "fast lifecycle advanced");
        }
        Ok(LifecycleReport {
            activated,
            completed,
        })
    }
}
