// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder worker and worker pool.
//!
//! The worker is an idempotent consumer of an at-least-once queue. Per job:
//! look up the ledger; if the slot is already recorded, stop. Otherwise
//! create the in-app notification, push with a bounded timeout, then insert
//! the ledger row. The insert is the atomic conflict-detecting write: losing
//! that race to another worker is success, not an error.
//!
//! A crash after the notification but before the ledger insert leaves no
//! row, so redelivery may produce a second notification for the slot. That
//! window is accepted.

use std::sync::Arc;
use std::time::Duration;

use sawm_config::model::{QueueConfig, ReminderConfig, WorkerConfig};
use sawm_core::types::{NewNotification, PushMessage, ReminderJob, ReminderLedgerEntry};
use sawm_core::{Clock, LedgerInsert, PushAdapter, SawmError, StorageAdapter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::shutdown;
use crate::tokens::TokenHealthManager;

/// What the push step produced. Push problems never fail the job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushSummary {
    pub delivered: usize,
    pub failed: usize,
    pub deactivated: usize,
    /// Set when the adapter errored or timed out as a whole.
    pub error: Option<String>,
}

/// Result of processing one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The ledger already held this slot. Nothing was created or pushed.
    AlreadySent,
    /// A notification was created and a push attempted.
    Dispatched {
        notification_id: i64,
        ledger: LedgerInsert,
        push: PushSummary,
    },
}

/// Processes decoded reminder jobs.
pub struct ReminderWorker {
    storage: Arc<dyn StorageAdapter>,
    push: Arc<dyn PushAdapter>,
    tokens: Arc<TokenHealthManager>,
    clock: Arc<dyn Clock>,
    push_timeout: Duration,
    notification_type: String,
}

impl ReminderWorker {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        push: Arc<dyn PushAdapter>,
        tokens: Arc<TokenHealthManager>,
        clock: Arc<dyn Clock>,
        push_timeout: Duration,
        reminder: &ReminderConfig,
    ) -> Self {
        Self {
            storage,
            push,
            tokens,
            clock,
            push_timeout,
            notification_type: reminder.notification_type.clone(),
        }
    }

    /// Handle one job. Errors are storage failures and leave the job for
    /// queue-level retry.
    pub async fn process(&self, job: &ReminderJob) -> Result<JobOutcome, SawmError> {
        if self
            .storage
            .find_ledger_entry(job.fast_id, &job.date_key, &job.time_key)
            .await?
            .is_some()
        {
            debug!(
                fast_id = job.fast_id,
                date_key = %job.date_key,
                time_key = %job.time_key,
                "reminder already sent, skipping"
            );
            return Ok(JobOutcome::AlreadySent);
        }

        let notification_id = self
            .storage
            .create_notification(
                &NewNotification {
                    user_id: job.user_id,
                    kind: self.notification_type.clone(),
                    title: job.title.clone(),
                    body: job.body.clone(),
                    data: job.data.clone(),
                },
                self.clock.now(),
            )
            .await?;

        let push = self.push(job).await;

        let ledger = self
            .storage
            .insert_ledger_entry(&ReminderLedgerEntry {
                fast_id: job.fast_id,
                user_id: job.user_id,
                date_key: job.date_key.clone(),
                time_key: job.time_key.clone(),
                sent_at: self.clock.now(),
            })
            .await?;

        match ledger {
            LedgerInsert::Recorded => info!(
                fast_id = job.fast_id,
                user_id = job.user_id,
                date_key = %job.date_key,
                time_key = %job.time_key,
                delivered = push.delivered,
                failed = push.failed,
                "reminder dispatched"
            ),
            LedgerInsert::AlreadyRecorded => debug!(
                fast_id = job.fast_id,
                date_key = %job.date_key,
                time_key = %job.time_key,
                "ledger row already written by another worker"
            ),
        }

        Ok(JobOutcome::Dispatched {
            notification_id,
            ledger,
            push,
        })
    }

    async fn push(&self, job: &ReminderJob) -> PushSummary {
        let message = PushMessage {
            title: job.title.clone(),
            body: job.body.clone(),
            data: job.data.clone(),
        };

        let outcomes =
            match tokio::time::timeout(self.push_timeout, self.push.deliver(job.user_id, &message))
                .await
            {
                Ok(Ok(outcomes)) => outcomes,
                Ok(Err(e)) => {
                    warn!(fast_id = job.fast_id, user_id = job.user_id, error = %e, "push delivery failed");
                    return PushSummary {
                        error: Some(e.to_string()),
                        ..PushSummary::default()
                    };
                }
                Err(_) => {
                    let e = SawmError::Timeout {
                        duration: self.push_timeout,
                    };
                    warn!(fast_id = job.fast_id, user_id = job.user_id, error = %e, "push delivery timed out");
                    return PushSummary {
                        error: Some(e.to_string()),
                        ..PushSummary::default()
                    };
                }
            };

        let delivered = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - delivered;
        if failed > 0 {
            warn!(fast_id = job.fast_id, user_id = job.user_id, failed, "push failed for some tokens");
        }

        let deactivated = match self.tokens.apply_outcomes(&outcomes).await {
            Ok(tokens) => tokens.len(),
            Err(e) => {
                warn!(user_id = job.user_id, error = %e, "token deactivation failed");
                0
            }
        };

        PushSummary {
            delivered,
            failed,
            deactivated,
            error: None,
        }
    }
}

/// Result of a single poll of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing deliverable.
    Idle,
    /// The job was processed and acknowledged.
    Acked { job_id: i64, outcome: JobOutcome },
    /// The job failed and was handed back to the queue for backoff or dead-lettering.
    Failed { job_id: i64, error: String },
}

/// Consumer tasks draining the reminder queue.
pub struct WorkerPool {
    storage: Arc<dyn StorageAdapter>,
    worker: Arc<ReminderWorker>,
    clock: Arc<dyn Clock>,
    queue_name: String,
    visibility: Duration,
    backoff_base: Duration,
    concurrency: usize,
    poll_interval: Duration,
    drain_timeout: Duration,
}

impl WorkerPool {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        worker: Arc<ReminderWorker>,
        clock: Arc<dyn Clock>,
        queue: &QueueConfig,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            storage,
            worker,
            clock,
            queue_name: queue.name.clone(),
            visibility: queue.visibility_timeout(),
            backoff_base: queue.backoff_base(),
            concurrency: config.concurrency.max(1),
            poll_interval: config.poll_interval(),
            drain_timeout: Duration::from_secs(30),
        }
    }

    /// How long shutdown waits for in-flight jobs before aborting them.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Claim and handle at most one job.
    pub async fn poll_once(&self) -> Result<PollOutcome, SawmError> {
        let Some(entry) = self
            .storage
            .dequeue(&self.queue_name, self.clock.now(), self.visibility)
            .await?
        else {
            return Ok(PollOutcome::Idle);
        };
        let job_id = entry.id;

        let result = match ReminderJob::from_payload(&entry.payload) {
            Ok(job) => self.worker.process(&job).await,
            Err(e) => {
                error!(job_id, attempts = entry.attempts, error = %e, "undecodable reminder job");
                Err(e)
            }
        };

        match result {
            Ok(outcome) => {
                self.storage.ack(job_id, self.clock.now()).await?;
                Ok(PollOutcome::Acked { job_id, outcome })
            }
            Err(e) => {
                let error = e.to_string();
                warn!(job_id, attempts = entry.attempts, error = %error, "reminder job failed");
                self.storage
                    .fail(job_id, &error, self.clock.now(), self.backoff_base)
                    .await?;
                Ok(PollOutcome::Failed { job_id, error })
            }
        }
    }

    /// Process jobs until the queue reports nothing deliverable. Returns the
    /// number of polls that claimed a job.
    pub async fn drain(&self) -> Result<usize, SawmError> {
        let mut handled = 0;
        while self.poll_once().await? != PollOutcome::Idle {
            handled += 1;
        }
        Ok(handled)
    }

    /// Run `concurrency` consumer tasks until `cancel` fires, then wait for
    /// in-flight jobs to finish.
    ///
    /// A claimed job always runs to completion or failure; cancellation is
    /// only observed between jobs.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            queue = %self.queue_name,
            concurrency = self.concurrency,
            "worker pool running"
        );

        let handles: Vec<JoinHandle<()>> = (0..self.concurrency)
            .map(|index| {
                let pool = Arc::clone(&self);
                let cancel = cancel.clone();
                tokio::spawn(async move { pool.consume(index, cancel).await })
            })
            .collect();

        cancel.cancelled().await;
        shutdown::drain_tasks(handles, self.drain_timeout).await;
        info!("worker pool stopped");
    }

    async fn consume(&self, index: usize, cancel: CancellationToken) {
        debug!(worker = index, "consumer started");
        while !cancel.is_cancelled() {
            let idle = match self.poll_once().await {
                Ok(PollOutcome::Idle) => true,
                Ok(_) => false,
                Err(e) => {
                    error!(worker = index, error = %e, "queue poll failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        debug!(worker = index, "consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use sawm_config::model::PushConfig;
    use sawm_core::types::{DeliveryOutcome, DeviceToken};
    use sawm_core::{AdapterType, HealthStatus, ManualClock, PluginAdapter, UserId};
    use sawm_storage::{Database, SqliteStorage};

    /// Records deliveries; optionally stalls or errors.
    #[derive(Default)]
    struct RecordingPush {
        calls: Mutex<Vec<UserId>>,
        outcomes: Vec<DeliveryOutcome>,
        stall: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl PluginAdapter for RecordingPush {
        fn name(&self) -> &str {
            "recording"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 1)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Push
        }
        async fn health_check(&self) -> Result<HealthStatus, SawmError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), SawmError> {
            Ok(())
        }
    }

    #[async_trait]
    impl PushAdapter for RecordingPush {
        async fn deliver(
            &self,
            user_id: UserId,
            _message: &PushMessage,
        ) -> Result<Vec<DeliveryOutcome>, SawmError> {
            self.calls.lock().unwrap().push(user_id);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if self.fail {
                return Err(SawmError::Push {
                    message: "gateway unavailable".into(),
                    source: None,
                });
            }
            Ok(self.outcomes.clone())
        }
    }

    struct Fixture {
        storage: Arc<SqliteStorage>,
        push: Arc<RecordingPush>,
        worker: Arc<ReminderWorker>,
        clock: ManualClock,
    }

    async fn fixture(push: RecordingPush) -> Fixture {
        let storage = Arc::new(SqliteStorage::from_database(
            Database::open_in_memory().await.unwrap(),
        ));
        let push = Arc::new(push);
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 0).unwrap());
        let tokens = Arc::new(TokenHealthManager::from_config(
            storage.clone(),
            &PushConfig::default(),
        ));
        let worker = Arc::new(ReminderWorker::new(
            storage.clone(),
            push.clone(),
            tokens,
            Arc::new(clock.clone()),
            Duration::from_millis(200),
            &ReminderConfig::default(),
        ));
        Fixture {
            storage,
            push,
            worker,
            clock,
        }
    }

    fn job() -> ReminderJob {
        let mut data = BTreeMap::new();
        data.insert("type".into(), "fast_prayer_reminder".into());
        ReminderJob {
            fast_id: 7,
            user_id: 3,
            date_key: "2024-01-01".into(),
            time_key: "14:30".into(),
            title: "Prayer reminder".into(),
            body: "It's 14:30. Take a moment to pray.".into(),
            data,
        }
    }

    #[tokio::test]
    async fn first_delivery_notifies_pushes_and_records() {
        let f = fixture(RecordingPush {
            outcomes: vec![DeliveryOutcome::delivered("tok")],
            ..RecordingPush::default()
        })
        .await;

        let outcome = f.worker.process(&job()).await.unwrap();
        match outcome {
            JobOutcome::Dispatched { ledger, push, .. } => {
                assert_eq!(ledger, LedgerInsert::Recorded);
                assert_eq!(push.delivered, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(f.storage.list_notifications(3).await.unwrap().len(), 1);
        assert_eq!(f.storage.list_ledger_entries(7).await.unwrap().len(), 1);
        assert_eq!(f.push.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replayed_job_is_a_no_op() {
        let f = fixture(RecordingPush::default()).await;

        f.worker.process(&job()).await.unwrap();
        f.clock.advance(chrono::Duration::seconds(45));
        assert_eq!(
            f.worker.process(&job()).await.unwrap(),
            JobOutcome::AlreadySent
        );

        assert_eq!(f.storage.list_notifications(3).await.unwrap().len(), 1);
        assert_eq!(f.storage.list_ledger_entries(7).await.unwrap().len(), 1);
        assert_eq!(f.push.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn push_error_still_records_ledger() {
        let f = fixture(RecordingPush {
            fail: true,
            ..RecordingPush::default()
        })
        .await;

        let outcome = f.worker.process(&job()).await.unwrap();
        let JobOutcome::Dispatched { ledger, push, .. } = outcome else {
            panic!("expected dispatch");
        };
        assert_eq!(ledger, LedgerInsert::Recorded);
        assert!(push.error.unwrap().contains("gateway unavailable"));
        assert_eq!(f.storage.list_notifications(3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn hung_push_is_bounded_by_timeout() {
        let f = fixture(RecordingPush {
            stall: Some(Duration::from_secs(30)),
            ..RecordingPush::default()
        })
        .await;

        let started = std::time::Instant::now();
        let outcome = f.worker.process(&job()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        let JobOutcome::Dispatched { ledger, push, .. } = outcome else {
            panic!("expected dispatch");
        };
        assert_eq!(ledger, LedgerInsert::Recorded);
        assert!(push.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn permanent_token_errors_deactivate_tokens() {
        let f = fixture(RecordingPush {
            outcomes: vec![
                DeliveryOutcome::failed("gone", Some("messaging/invalid-registration-token".into())),
                DeliveryOutcome::delivered("ok"),
            ],
            ..RecordingPush::default()
        })
        .await;
        for token in ["gone", "ok"] {
            f.storage
                .register_device_token(&DeviceToken {
                    user_id: 3,
                    token: token.into(),
                    platform: "ios".into(),
                    is_active: true,
                    last_active_at: f.clock.now(),
                })
                .await
                .unwrap();
        }

        let JobOutcome::Dispatched { push, .. } = f.worker.process(&job()).await.unwrap() else {
            panic!("expected dispatch");
        };
        assert_eq!(push.deactivated, 1);
        assert!(!f.storage.get_device_token("gone").await.unwrap().unwrap().is_active);
        assert!(f.storage.get_device_token("ok").await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn pool_acks_processed_jobs_and_fails_bad_payloads() {
        let f = fixture(RecordingPush::default()).await;
        let pool = WorkerPool::new(
            f.storage.clone(),
            f.worker.clone(),
            Arc::new(f.clock.clone()),
            &QueueConfig::default(),
            &WorkerConfig::default(),
        );
        let queue = QueueConfig::default().name;

        let good = f
            .storage
            .enqueue(&queue, &job().to_payload().unwrap(), f.clock.now())
            .await
            .unwrap();
        let bad = f
            .storage
            .enqueue(&queue, "not json", f.clock.now())
            .await
            .unwrap();

        let first = pool.poll_once().await.unwrap();
        assert!(matches!(first, PollOutcome::Acked { job_id, .. } if job_id == good));
        let second = pool.poll_once().await.unwrap();
        assert!(matches!(second, PollOutcome::Failed { job_id, .. } if job_id == bad));
        assert_eq!(pool.poll_once().await.unwrap(), PollOutcome::Idle);

        // The failed job is back in the queue with a backoff delay.
        assert_eq!(f.storage.queue_depth(&queue).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn pool_run_stops_on_cancel() {
        let f = fixture(RecordingPush::default()).await;
        let pool = Arc::new(
            WorkerPool::new(
                f.storage.clone(),
                f.worker.clone(),
                Arc::new(f.clock.clone()),
                &QueueConfig::default(),
                &WorkerConfig {
                    poll_interval_ms: 10,
                    ..WorkerConfig::default()
                },
            )
            .with_drain_timeout(Duration::from_secs(1)),
        );
        f.storage
            .enqueue(&QueueConfig::default().name, &job().to_payload().unwrap(), f.clock.now())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pool.run(cancel.clone()));

        for _ in 0..100 {
            if f.storage.list_ledger_entries(7).await.unwrap().len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(f.storage.list_ledger_entries(7).await.unwrap().len(), 1);
        assert_eq!(f.storage.queue_depth(&QueueConfig::default().name).await.unwrap(), 0);
    }
}
