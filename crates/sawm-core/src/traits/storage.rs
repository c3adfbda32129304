// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SawmError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    DeviceToken, FastId, FastingSession, LedgerInsert, NewFastingSession, NewNotification,
    NotificationRecord, QueueEntry, ReminderLedgerEntry, UserId,
};

/// Adapter for the engine's persisted state: the session store, the dedup
/// ledger, the durable job queue, notification records and device tokens.
///
/// Correctness of concurrent workers rests on the backend's own
/// transactional guarantees; callers hold no in-process locks.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), SawmError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), SawmError>;

    // --- Session store ---

    /// Insert a new session in the `upcoming` state and return its id.
    async fn create_session(
        &self,
        session: &NewFastingSession,
        now: DateTime<Utc>,
    ) -> Result<FastId, SawmError>;

    async fn get_session(&self, id: FastId) -> Result<Option<FastingSession>, SawmError>;

    /// Bulk `upcoming -> active` for sessions whose start time has passed.
    /// Returns the number of rows transitioned.
    async fn activate_due_sessions(&self, now: DateTime<Utc>) -> Result<u64, SawmError>;

    /// Bulk `active -> completed` for sessions whose end time has passed,
    /// stamping `completed_at = now`. Returns the number of rows transitioned.
    async fn complete_due_sessions(&self, now: DateTime<Utc>) -> Result<u64, SawmError>;

    /// All sessions that are `active` with reminders enabled.
    async fn list_reminder_candidates(&self) -> Result<Vec<FastingSession>, SawmError>;

    // --- Dedup ledger ---

    async fn find_ledger_entry(
        &self,
        fast_id: FastId,
        date_key: &str,
        time_key: &str,
    ) -> Result<Option<ReminderLedgerEntry>, SawmError>;

    /// Atomically insert a ledger row, reporting a uniqueness conflict as
    /// [`LedgerInsert::AlreadyRecorded`] rather than an error.
    async fn insert_ledger_entry(
        &self,
        entry: &ReminderLedgerEntry,
    ) -> Result<LedgerInsert, SawmError>;

    async fn list_ledger_entries(
        &self,
        fast_id: FastId,
    ) -> Result<Vec<ReminderLedgerEntry>, SawmError>;

    // --- Job queue ---

    /// Durably enqueue a payload. Returns the queue entry id after commit.
    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, SawmError>;

    /// Claim the next deliverable entry, including entries whose previous
    /// claim expired after `visibility`.
    async fn dequeue(
        &self,
        queue_name: &str,
        now: DateTime<Utc>,
        visibility: Duration,
    ) -> Result<Option<QueueEntry>, SawmError>;

    async fn ack(&self, id: i64, now: DateTime<Utc>) -> Result<(), SawmError>;

    /// Record a failed attempt and reschedule with exponential backoff, or
    /// mark the entry failed once its attempts are exhausted.
    async fn fail(
        &self,
        id: i64,
        error: &str,
        now: DateTime<Utc>,
        backoff_base: Duration,
    ) -> Result<(), SawmError>;

    /// Number of entries that are pending or being processed.
    async fn queue_depth(&self, queue_name: &str) -> Result<i64, SawmError>;

    // --- Notifications ---

    async fn create_notification(
        &self,
        notification: &NewNotification,
        now: DateTime<Utc>,
    ) -> Result<i64, SawmError>;

    async fn list_notifications(
        &self,
        user_id: UserId,
    ) -> Result<Vec<NotificationRecord>, SawmError>;

    // --- Device tokens ---

    async fn register_device_token(&self, token: &DeviceToken) -> Result<(), SawmError>;

    async fn get_device_token(&self, token: &str) -> Result<Option<DeviceToken>, SawmError>;

    async fn list_active_tokens(&self, user_id: UserId) -> Result<Vec<DeviceToken>, SawmError>;

    /// Returns `true` if an active token was switched off.
    async fn deactivate_token(&self, token: &str) -> Result<bool, SawmError>;

    /// Deactivate every active token last seen before `cutoff`.
    async fn deactivate_stale_tokens(&self, cutoff: DateTime<Utc>) -> Result<u64, SawmError>;
}
