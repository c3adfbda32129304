// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sawm reminder engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Sawm configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SawmConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Clock tick scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Durable job queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Reminder worker pool settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Push delivery and token health settings.
    #[serde(default)]
    pub push: PushConfig,

    /// Reminder content settings.
    #[serde(default)]
    pub reminder: ReminderConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "sawm".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a connection waits on a lock held by another process.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("sawm").join("sawm.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("sawm.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Clock tick scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Run the scheduler in `serve`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tick period in seconds. Reminder slots are minute-grained.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Delay the first tick until the next wall-clock minute boundary.
    #[serde(default = "default_true")]
    pub align_to_minute: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_secs: default_tick_interval_secs(),
            align_to_minute: true,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_tick_interval_secs() -> u64 {
    60
}

/// Durable job queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Queue name reminder jobs are written to.
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Attempts before a job is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// A claimed job becomes deliverable again after this many seconds
    /// without an ack.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
        }
    }
}

impl QueueConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }
}

fn default_queue_name() -> String {
    "prayer-reminders".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_visibility_timeout_secs() -> u64 {
    300
}

/// Reminder worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Run the worker pool in `serve`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of concurrent consumer tasks in this process.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Sleep between polls of an empty queue, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Push delivery and token health configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// HTTP push gateway endpoint. `None` selects the log-only transport.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent to the push gateway.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Upper bound on one delivery call, in seconds.
    #[serde(default = "default_push_timeout_secs")]
    pub timeout_secs: u64,

    /// Provider error codes that mean a token is permanently invalid.
    #[serde(default = "default_permanent_error_codes")]
    pub permanent_error_codes: Vec<String>,

    /// Deactivate tokens unseen for this many days. `0` disables pruning.
    #[serde(default = "default_stale_token_days")]
    pub stale_token_days: u32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            timeout_secs: default_push_timeout_secs(),
            permanent_error_codes: default_permanent_error_codes(),
            stale_token_days: default_stale_token_days(),
        }
    }
}

impl PushConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_push_timeout_secs() -> u64 {
    10
}

fn default_permanent_error_codes() -> Vec<String> {
    vec![
        "messaging/registration-token-not-registered".to_string(),
        "messaging/invalid-registration-token".to_string(),
        "messaging/invalid-argument".to_string(),
    ]
}

fn default_stale_token_days() -> u32 {
    60
}

/// Reminder content configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReminderConfig {
    /// Notification title for prayer reminders.
    #[serde(default = "default_reminder_title")]
    pub title: String,

    /// `type` recorded on in-app notifications and in push data.
    #[serde(default = "default_notification_type")]
    pub notification_type: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            title: default_reminder_title(),
            notification_type: default_notification_type(),
        }
    }
}

fn default_reminder_title() -> String {
    "Prayer reminder".to_string()
}

fn default_notification_type() -> String {
    "fast_prayer_reminder".to_string()
}
