// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clock tick scheduler.
//!
//! Each tick reads the clock once, advances session lifecycles, selects the
//! reminder candidates for the tick's minute and enqueues one job per
//! candidate. The run loop awaits every tick before starting the next, so
//! ticks never overlap within a process. Overlap across processes is safe
//! because workers dedup on the ledger.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use sawm_config::model::{QueueConfig, ReminderConfig};
use sawm_core::types::ReminderSlot;
use sawm_core::{Clock, SawmError, StorageAdapter};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lifecycle::LifecycleUpdater;
use crate::selector::select_candidates;
use crate::tokens::TokenHealthManager;

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub date_key: String,
    pub time_key: String,
    pub activated: u64,
    pub completed: u64,
    pub candidates: usize,
    pub enqueued: usize,
}

pub struct Scheduler {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    lifecycle: LifecycleUpdater,
    tokens: Option<Arc<TokenHealthManager>>,
    queue_name: String,
    reminder: ReminderConfig,
    /// UTC date of the last stale-token prune.
    last_prune: Mutex<Option<String>>,
}

impl Scheduler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
        queue: &QueueConfig,
        reminder: &ReminderConfig,
    ) -> Self {
        Self {
            lifecycle: LifecycleUpdater::new(storage.clone()),
            storage,
            clock,
            tokens: None,
            queue_name: queue.name.clone(),
            reminder: reminder.clone(),
            last_prune: Mutex::new(None),
        }
    }

    /// Prune stale device tokens on the first tick of each UTC date.
    pub fn with_token_health(mut self, tokens: Arc<TokenHealthManager>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Run one tick at the clock's current instant.
    ///
    /// A lifecycle failure aborts the tick before any candidate is read.
    pub async fn tick(&self) -> Result<TickReport, SawmError> {
        let now = self.clock.now();
        let slot = ReminderSlot::from_instant(now);

        let lifecycle = self.lifecycle.advance(now).await?;

        let sessions = self.storage.list_reminder_candidates().await?;
        let jobs = select_candidates(&sessions, &slot, &self.reminder);

        let mut enqueued = 0;
        for job in &jobs {
            let payload = job.to_payload()?;
            let job_id = self.storage.enqueue(&self.queue_name, &payload, now).await?;
            debug!(
                job_id,
                fast_id = job.fast_id,
                user_id = job.user_id,
                date_key = %job.date_key,
                time_key = %job.time_key,
                "reminder job enqueued"
            );
            enqueued += 1;
        }

        self.prune_tokens_once_per_day(now, &slot.date_key).await;

        let report = TickReport {
            date_key: slot.date_key,
            time_key: slot.time_key,
            activated: lifecycle.activated,
            completed: lifecycle.completed,
            candidates: sessions.len(),
            enqueued,
        };
        if report.enqueued > 0 || report.activated > 0 || report.completed > 0 {
            info!(
                date_key = %report.date_key,
                time_key = %report.time_key,
                activated = report.activated,
                completed = report.completed,
                enqueued = report.enqueued,
                "tick complete"
            );
        } else {
            debug!(time_key = %report.time_key, candidates = report.candidates, "tick idle");
        }
        Ok(report)
    }

    async fn prune_tokens_once_per_day(&self, now: DateTime<Utc>, date_key: &str) {
        let Some(tokens) = &self.tokens else {
            return;
        };
        let mut last = self.last_prune.lock().await;
        if last.as_deref() == Some(date_key) {
            return;
        }
        match tokens.prune_stale(now).await {
            Ok(_) => *last = Some(date_key.to_string()),
            Err(e) => warn!(error = %e, "stale token prune failed, will retry next tick"),
        }
    }

    /// Tick every `period` until `cancel` fires.
    ///
    /// With `align_to_minute`, the first tick waits for the next wall-clock
    /// minute boundary. Missed ticks are skipped, never replayed. A failed
    /// tick is logged and the next one still fires.
    pub async fn run(&self, period: Duration, align_to_minute: bool, cancel: CancellationToken) {
        let delay = if align_to_minute {
            until_next_minute(self.clock.now())
        } else {
            Duration::ZERO
        };
        info!(
            period_secs = period.as_secs(),
            first_tick_in_ms = delay.as_millis() as u64,
            queue = %self.queue_name,
            "scheduler running"
        );

        let mut interval = tokio::time::interval_at(Instant::now() + delay, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping scheduler");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, transient = e.is_transient(), "tick failed");
                    }
                }
            }
        }
    }
}

/// Time from `now` to the start of the next minute.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute = Duration::from_secs(u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    if into_minute.is_zero() {
        Duration::ZERO
    } else {
        Duration::from_secs(60).saturating_sub(into_minute)
    }
}
