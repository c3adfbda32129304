// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the storage, push and dispatch crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a fasting session.
pub type FastId = i64;

/// Identifier of a user.
pub type UserId = i64;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Push,
    PushTransport,
}

/// Lifecycle state of a fasting session.
///
/// Transitions only move forward: `Upcoming -> Active -> Completed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FastStatus {
    Upcoming,
    Active,
    Completed,
}

impl FastStatus {
    /// The value stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            FastStatus::Upcoming => "upcoming",
            FastStatus::Active => "active",
            FastStatus::Completed => "completed",
        }
    }

    /// Whether `next` is the single legal successor of `self`.
    pub fn can_transition_to(self, next: FastStatus) -> bool {
        matches!(
            (self, next),
            (FastStatus::Upcoming, FastStatus::Active) | (FastStatus::Active, FastStatus::Completed)
        )
    }
}

/// A persisted fasting session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingSession {
    pub id: FastId,
    pub user_id: UserId,
    pub status: FastStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Set exactly when `status` becomes `Completed`.
    pub completed_at: Option<DateTime<Utc>>,
    pub reminder_enabled: bool,
    /// Ordered `"HH:MM"` (24h, zero-padded) reminder times in UTC.
    pub prayer_times: Vec<String>,
    pub prayer_focus: Option<String>,
}

/// Input for the external session-creation flow. New sessions start `Upcoming`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFastingSession {
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reminder_enabled: bool,
    pub prayer_times: Vec<String>,
    pub prayer_focus: Option<String>,
}

/// The UTC date and minute-of-day that identify a reminder slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderSlot {
    /// `YYYY-MM-DD`
    pub date_key: String,
    /// `HH:MM`
    pub time_key: String,
}

impl ReminderSlot {
    /// Derive the slot containing `instant`. Seconds are truncated.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            date_key: instant.format("%Y-%m-%d").to_string(),
            time_key: instant.format("%H:%M").to_string(),
        }
    }
}

/// Queue payload for one logical reminder.
///
/// Serialized with camelCase keys; the same logical reminder may be delivered
/// to workers more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderJob {
    pub fast_id: FastId,
    pub user_id: UserId,
    pub date_key: String,
    pub time_key: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ReminderJob {
    /// Encode as the JSON queue payload.
    pub fn to_payload(&self) -> Result<String, crate::SawmError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON queue payload.
    pub fn from_payload(payload: &str) -> Result<Self, crate::SawmError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// A reminder that has already been sent. Unique per `(fast_id, date_key, time_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderLedgerEntry {
    pub fast_id: FastId,
    pub user_id: UserId,
    pub date_key: String,
    pub time_key: String,
    pub sent_at: DateTime<Utc>,
}

/// Result of an atomic ledger insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerInsert {
    /// This call created the row.
    Recorded,
    /// The uniqueness constraint rejected the row; another actor already recorded it.
    AlreadyRecorded,
}

/// A registered push device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceToken {
    pub user_id: UserId,
    pub token: String,
    pub platform: String,
    pub is_active: bool,
    pub last_active_at: DateTime<Utc>,
}

/// A user-visible in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a [`NotificationRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// Content handed to the push delivery adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// Per-token result of a push delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub token: String,
    pub success: bool,
    pub error_code: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            error_code: None,
        }
    }

    pub fn failed(token: impl Into<String>, error_code: Option<String>) -> Self {
        Self {
            token: token.into(),
            success: false,
            error_code,
        }
    }
}

/// A row of the durable job queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub available_at: String,
    pub locked_until: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
