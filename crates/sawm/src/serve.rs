// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sawm serve`, `sawm worker` and `sawm tick` implementations.
//!
//! All three open the same SQLite store (running migrations) and wire the
//! dispatch components from configuration. `serve` runs the scheduler and
//! the worker pool side by side until SIGINT/SIGTERM.

use std::sync::Arc;

use sawm_config::SawmConfig;
use sawm_core::{
    Clock, HealthStatus, ManualClock, PluginAdapter, PushAdapter, SawmError, StorageAdapter,
    SystemClock,
};
use sawm_dispatch::shutdown;
use sawm_dispatch::{ReminderWorker, Scheduler, TokenHealthManager, WorkerPool};
use sawm_push::build_push_adapter;
use sawm_storage::SqliteStorage;
use tracing::{info, warn};

/// Shared components built from configuration.
struct Engine {
    storage: Arc<dyn StorageAdapter>,
    push: Arc<dyn PushAdapter>,
    clock: Arc<dyn Clock>,
    tokens: Arc<TokenHealthManager>,
    config: SawmConfig,
}

impl Engine {
    async fn open(config: SawmConfig, clock: Arc<dyn Clock>) -> Result<Self, SawmError> {
        let storage = SqliteStorage::new(config.storage.clone())
            .with_max_attempts(config.queue.max_attempts);
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        check_adapter(storage.as_ref()).await?;
        info!(path = %config.storage.database_path, "storage ready");

        let push = build_push_adapter(&config.push, storage.clone())?;
        check_adapter(push.as_ref()).await?;

        let tokens = Arc::new(TokenHealthManager::from_config(
            storage.clone(),
            &config.push,
        ));
        Ok(Self {
            storage,
            push,
            clock,
            tokens,
            config,
        })
    }

    fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.storage.clone(),
            self.clock.clone(),
            &self.config.queue,
            &self.config.reminder,
        )
        .with_token_health(self.tokens.clone())
    }

    fn pool(&self) -> Arc<WorkerPool> {
        let worker = Arc::new(ReminderWorker::new(
            self.storage.clone(),
            self.push.clone(),
            self.tokens.clone(),
            self.clock.clone(),
            self.config.push.timeout(),
            &self.config.reminder,
        ));
        Arc::new(WorkerPool::new(
            self.storage.clone(),
            worker,
            self.clock.clone(),
            &self.config.queue,
            &self.config.worker,
        ))
    }

    async fn close(&self) -> Result<(), SawmError> {
        if let Err(e) = self.push.shutdown().await {
            warn!(adapter = self.push.name(), error = %e, "push adapter shutdown failed");
        }
        self.storage.close().await
    }
}

/// Log an adapter's health. Degraded adapters are allowed to start,
/// unhealthy ones abort startup.
async fn check_adapter<A: PluginAdapter + ?Sized>(adapter: &A) -> Result<(), SawmError> {
    let name = adapter.name();
    let version = adapter.version();
    let kind = adapter.adapter_type();
    match adapter.health_check().await? {
        HealthStatus::Healthy => {
            info!(adapter = name, %version, %kind, "adapter healthy");
            Ok(())
        }
        HealthStatus::Degraded(reason) => {
            warn!(adapter = name, %version, %kind, reason = %reason, "adapter degraded");
            Ok(())
        }
        HealthStatus::Unhealthy(reason) => Err(SawmError::Internal(format!(
            "{kind} adapter {name} is unhealthy: {reason}"
        ))),
    }
}

/// Runs the `sawm serve` command.
pub async fn run_serve(config: SawmConfig) -> Result<(), SawmError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, "starting sawm serve");

    let engine = Engine::open(config, Arc::new(SystemClock)).await?;
    let cancel = shutdown::install_signal_handler();

    let pool_task = if engine.config.worker.enabled {
        let pool = engine.pool();
        let pool_cancel = cancel.clone();
        Some(tokio::spawn(async move { pool.run(pool_cancel).await }))
    } else {
        info!("worker pool disabled");
        None
    };

    if engine.config.scheduler.enabled {
        engine
            .scheduler()
            .run(
                engine.config.scheduler.tick_interval(),
                engine.config.scheduler.align_to_minute,
                cancel.clone(),
            )
            .await;
    } else {
        info!("scheduler disabled");
        cancel.cancelled().await;
    }

    if let Some(task) = pool_task
        && let Err(e) = task.await
    {
        return Err(SawmError::Internal(format!("worker pool task failed: {e}")));
    }

    engine.close().await?;
    info!("sawm serve shutdown complete");
    Ok(())
}

/// Runs the `sawm worker` command.
pub async fn run_worker(config: SawmConfig) -> Result<(), SawmError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, "starting sawm worker");

    let engine = Engine::open(config, Arc::new(SystemClock)).await?;
    let cancel = shutdown::install_signal_handler();
    engine.pool().run(cancel).await;

    engine.close().await?;
    info!("sawm worker shutdown complete");
    Ok(())
}

/// Runs the `sawm tick` command, optionally at a fixed instant.
pub async fn run_tick(config: SawmConfig, at: Option<&str>) -> Result<(), SawmError> {
    init_tracing(&config.service.log_level);

    let clock: Arc<dyn Clock> = match at {
        Some(raw) => Arc::new(ManualClock::new(sawm_core::clock::parse_timestamp(raw)?)),
        None => Arc::new(SystemClock),
    };
    let engine = Engine::open(config, clock).await?;
    let report = engine.scheduler().tick().await?;

    println!(
        "tick {} {}: activated={} completed={} candidates={} enqueued={}",
        report.date_key,
        report.time_key,
        report.activated,
        report.completed,
        report.candidates,
        report.enqueued
    );
    engine.close().await
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sawm={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use sawm_storage::{Database, SqliteStorage};
    use sawm_test_utils::MockTransport;

    #[tokio::test]
    async fn unhealthy_storage_aborts_startup() {
        let storage = SqliteStorage::new(Default::default());
        let err = check_adapter(&storage).await.unwrap_err();
        assert!(err.to_string().contains("sqlite is unhealthy"), "{err}");
    }

    #[tokio::test]
    async fn healthy_and_degraded_adapters_start() {
        let storage: Arc<dyn StorageAdapter> = Arc::new(SqliteStorage::from_database(
            Database::open_in_memory().await.unwrap(),
        ));
        check_adapter(storage.as_ref()).await.unwrap();

        // No endpoint configured: the log transport reports degraded.
        let push = build_push_adapter(&Default::default(), storage.clone()).unwrap();
        assert!(matches!(
            push.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
        check_adapter(push.as_ref()).await.unwrap();

        let transport = MockTransport::new();
        check_adapter(&transport).await.unwrap();
    }

    #[tokio::test]
    async fn engine_close_shuts_down_push_then_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SawmConfig::default();
        config.storage.database_path = dir.path().join("engine.db").to_string_lossy().to_string();

        let engine = Engine::open(config, Arc::new(SystemClock)).await.unwrap();
        assert_eq!(engine.push.name(), "fanout-push");
        engine.close().await.unwrap();
    }
}
