// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full dispatch stack over a temp SQLite
//! database and a [`ManualClock`]: scheduler, worker and worker pool share
//! one storage adapter, and the push step is whatever adapter the test
//! injects. Time only moves when the test moves it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sawm_config::model::{SawmConfig, StorageConfig};
use sawm_core::types::{
    DeviceToken, FastingSession, NewFastingSession, NotificationRecord, ReminderLedgerEntry,
};
use sawm_core::{
    Clock, FastId, ManualClock, PushAdapter, PushTransport, SawmError, StorageAdapter, UserId,
};
use sawm_dispatch::{ReminderWorker, Scheduler, TickReport, TokenHealthManager, WorkerPool};
use sawm_push::FanoutPushAdapter;
use sawm_storage::SqliteStorage;

use crate::mock_push::MockPushAdapter;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: SawmConfig,
    start: Option<DateTime<Utc>>,
    push: Option<Arc<dyn PushAdapter>>,
    transport: Option<Arc<dyn PushTransport>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: SawmConfig::default(),
            start: None,
            push: None,
            transport: None,
        }
    }

    /// Use `config` instead of the defaults. The storage path is always
    /// replaced with a temp database.
    pub fn with_config(mut self, config: SawmConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial reading of the manual clock.
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Push adapter used by every worker. Defaults to a [`MockPushAdapter`].
    pub fn with_push(mut self, push: Arc<dyn PushAdapter>) -> Self {
        self.push = Some(push);
        self
    }

    /// Deliver through a [`FanoutPushAdapter`] over the harness storage and
    /// `transport`. Takes precedence over [`with_push`](Self::with_push).
    pub fn with_transport(mut self, transport: Arc<dyn PushTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SawmError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SawmError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            ..config.storage
        };

        let storage = SqliteStorage::new(config.storage.clone())
            .with_max_attempts(config.queue.max_attempts);
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let clock = ManualClock::new(self.start.unwrap_or_else(Utc::now));
        let push: Arc<dyn PushAdapter> = match (self.transport, self.push) {
            (Some(transport), _) => Arc::new(FanoutPushAdapter::new(storage.clone(), transport)),
            (None, Some(push)) => push,
            (None, None) => Arc::new(MockPushAdapter::new()),
        };

        let tokens = Arc::new(TokenHealthManager::from_config(
            storage.clone(),
            &config.push,
        ));
        let scheduler = Scheduler::new(
            storage.clone(),
            Arc::new(clock.clone()),
            &config.queue,
            &config.reminder,
        )
        .with_token_health(tokens.clone());

        let harness = TestHarness {
            storage,
            clock,
            push,
            tokens,
            scheduler,
            config,
            _temp_dir: temp_dir,
        };
        Ok(harness)
    }
}

/// A complete dispatch environment with a manual clock and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// The clock every component reads.
    pub clock: ManualClock,
    /// Push adapter shared by all workers.
    pub push: Arc<dyn PushAdapter>,
    pub tokens: Arc<TokenHealthManager>,
    pub scheduler: Scheduler,
    pub config: SawmConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A fresh worker over the shared storage, push adapter and clock.
    /// Call twice to get two independent concurrent consumers.
    pub fn worker(&self) -> Arc<ReminderWorker> {
        Arc::new(ReminderWorker::new(
            self.storage.clone(),
            self.push.clone(),
            self.tokens.clone(),
            Arc::new(self.clock.clone()),
            self.config.push.timeout(),
            &self.config.reminder,
        ))
    }

    /// A worker pool with its own worker.
    pub fn pool(&self) -> Arc<WorkerPool> {
        Arc::new(WorkerPool::new(
            self.storage.clone(),
            self.worker(),
            Arc::new(self.clock.clone()),
            &self.config.queue,
            &self.config.worker,
        ))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn set_time(&self, instant: DateTime<Utc>) {
        self.clock.set(instant);
    }

    /// Run one scheduler tick at the current clock reading.
    pub async fn tick(&self) -> Result<TickReport, SawmError> {
        self.scheduler.tick().await
    }

    /// Tick, then let one pool drain everything that became deliverable.
    pub async fn tick_and_drain(&self) -> Result<(TickReport, usize), SawmError> {
        let report = self.tick().await?;
        let handled = self.pool().drain().await?;
        Ok((report, handled))
    }

    /// Create a session with reminders enabled.
    pub async fn create_session(
        &self,
        user_id: UserId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        prayer_times: &[&str],
    ) -> Result<FastId, SawmError> {
        let session = NewFastingSession {
            user_id,
            start_time,
            end_time,
            reminder_enabled: true,
            prayer_times: prayer_times.iter().map(|t| t.to_string()).collect(),
            prayer_focus: None,
        };
        self.storage.create_session(&session, self.now()).await
    }

    pub async fn session(&self, id: FastId) -> Result<Option<FastingSession>, SawmError> {
        self.storage.get_session(id).await
    }

    /// Register an active token last seen now.
    pub async fn register_token(&self, user_id: UserId, token: &str) -> Result<(), SawmError> {
        self.storage
            .register_device_token(&DeviceToken {
                user_id,
                token: token.to_string(),
                platform: "android".to_string(),
                is_active: true,
                last_active_at: self.now(),
            })
            .await
    }

    pub async fn ledger(&self, fast_id: FastId) -> Result<Vec<ReminderLedgerEntry>, SawmError> {
        self.storage.list_ledger_entries(fast_id).await
    }

    pub async fn notifications(
        &self,
        user_id: UserId,
    ) -> Result<Vec<NotificationRecord>, SawmError> {
        self.storage.list_notifications(user_id).await
    }

    pub async fn queue_depth(&self) -> Result<i64, SawmError> {
        self.storage.queue_depth(&self.config.queue.name).await
    }
}
