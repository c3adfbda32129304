// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use sawm_config::model::StorageConfig;
use sawm_core::types::{
    DeviceToken, FastingSession, NewFastingSession, NewNotification, NotificationRecord,
    QueueEntry, ReminderLedgerEntry,
};
use sawm_core::{
    AdapterType, FastId, HealthStatus, LedgerInsert, PluginAdapter, SawmError, StorageAdapter,
    UserId,
};

use crate::database::{Database, DatabaseOptions};
use crate::queries;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    max_attempts: u32,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database. `initialize` becomes an error.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Attempts allowed for newly enqueued jobs.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, SawmError> {
        self.db.get().ok_or_else(|| SawmError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SawmError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(format!("database unreachable: {e}")),
        })
    }

    async fn shutdown(&self) -> Result<(), SawmError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SawmError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, DatabaseOptions::from(&self.config)).await?;
        self.db.set(db).map_err(|_| SawmError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SawmError> {
        self.database()?.close().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Session store ---

    async fn create_session(
        &self,
        session: &NewFastingSession,
        now: DateTime<Utc>,
    ) -> Result<FastId, SawmError> {
        queries::sessions::create_session(self.database()?, session, now).await
    }

    async fn get_session(&self, id: FastId) -> Result<Option<FastingSession>, SawmError> {
        queries::sessions::get_session(self.database()?, id).await
    }

    async fn activate_due_sessions(&self, now: DateTime<Utc>) -> Result<u64, SawmError> {
        queries::sessions::activate_due_sessions(self.database()?, now).await
    }

    async fn complete_due_sessions(&self, now: DateTime<Utc>) -> Result<u64, SawmError> {
        queries::sessions::complete_due_sessions(self.database()?, now).await
    }

    async fn list_reminder_candidates(&self) -> Result<Vec<FastingSession>, SawmError> {
        queries::sessions::list_reminder_candidates(self.database()?).await
    }

    // --- Dedup ledger ---

    async fn find_ledger_entry(
        &self,
        fast_id: FastId,
        date_key: &str,
        time_key: &str,
    ) -> Result<Option<ReminderLedgerEntry>, SawmError> {
        queries::ledger::find_ledger_entry(self.database()?, fast_id, date_key, time_key).await
    }

    async fn insert_ledger_entry(
        &self,
        entry: &ReminderLedgerEntry,
    ) -> Result<LedgerInsert, SawmError> {
        queries::ledger::insert_ledger_entry(self.database()?, entry).await
    }

    async fn list_ledger_entries(
        &self,
        fast_id: FastId,
    ) -> Result<Vec<ReminderLedgerEntry>, SawmError> {
        queries::ledger::list_ledger_entries(self.database()?, fast_id).await
    }

    // --- Job queue ---

    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, SawmError> {
        queries::queue::enqueue(self.database()?, queue_name, payload, self.max_attempts, now)
            .await
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        now: DateTime<Utc>,
        visibility: Duration,
    ) -> Result<Option<QueueEntry>, SawmError> {
        queries::queue::dequeue(self.database()?, queue_name, now, visibility).await
    }

    async fn ack(&self, id: i64, now: DateTime<Utc>) -> Result<(), SawmError> {
        queries::queue::ack(self.database()?, id, now).await
    }

    async fn fail(
        &self,
        id: i64,
        error: &str,
        now: DateTime<Utc>,
        backoff_base: Duration,
    ) -> Result<(), SawmError> {
        queries::queue::fail(self.database()?, id, error, now, backoff_base).await
    }

    async fn queue_depth(&self, queue_name: &str) -> Result<i64, SawmError> {
        queries::queue::queue_depth(self.database()?, queue_name).await
    }

    // --- Notifications ---

    async fn create_notification(
        &self,
        notification: &NewNotification,
        now: DateTime<Utc>,
    ) -> Result<i64, SawmError> {
        queries::notifications::create_notification(self.database()?, notification, now).await
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
    ) -> Result<Vec<NotificationRecord>, SawmError> {
        queries::notifications::list_notifications(self.database()?, user_id).await
    }

    // --- Device tokens ---

    async fn register_device_token(&self, token: &DeviceToken) -> Result<(), SawmError> {
        queries::tokens::register_device_token(self.database()?, token).await
    }

    async fn get_device_token(&self, token: &str) -> Result<Option<DeviceToken>, SawmError> {
        queries::tokens::get_device_token(self.database()?, token).await
    }

    async fn list_active_tokens(&self, user_id: UserId) -> Result<Vec<DeviceToken>, SawmError> {
        queries::tokens::list_active_tokens(self.database()?, user_id).await
    }

    async fn deactivate_token(&self, token: &str) -> Result<bool, SawmError> {
        queries::tokens::deactivate_token(self.database()?, token).await
    }

    async fn deactivate_stale_tokens(&self, cutoff: DateTime<Utc>) -> Result<u64, SawmError> {
        queries::tokens::deactivate_stale_tokens(self.database()?, cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_is_unhealthy_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn health_check_returns_healthy_for_wrapped_database() {
        let storage = SqliteStorage::from_database(Database::open_in_memory().await.unwrap());
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn queue_operations_use_configured_max_attempts() {
        let storage = SqliteStorage::from_database(Database::open_in_memory().await.unwrap())
            .with_max_attempts(2);

        let id = storage
            .enqueue("reminders", r#"{"fastId":1}"#, noon())
            .await
            .unwrap();
        let entry = storage
            .dequeue("reminders", noon(), Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.max_attempts, 2);
        assert_eq!(storage.queue_depth("reminders").await.unwrap(), 1);

        storage.ack(entry.id, noon()).await.unwrap();
        assert_eq!(storage.queue_depth("reminders").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn session_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let id = storage
            .create_session(
                &NewFastingSession {
                    user_id: 1,
                    start_time: noon(),
                    end_time: noon() + chrono::Duration::hours(6),
                    reminder_enabled: true,
                    prayer_times: vec!["14:30".into()],
                    prayer_focus: None,
                },
                noon(),
            )
            .await
            .unwrap();

        assert_eq!(storage.activate_due_sessions(noon()).await.unwrap(), 1);
        assert_eq!(storage.list_reminder_candidates().await.unwrap().len(), 1);

        let end = noon() + chrono::Duration::hours(6);
        assert_eq!(storage.complete_due_sessions(end).await.unwrap(), 1);
        let session = storage.get_session(id).await.unwrap().unwrap();
        assert_eq!(session.completed_at, Some(end));
        assert!(storage.list_reminder_candidates().await.unwrap().is_empty());

        storage.shutdown().await.unwrap();
    }
}
