// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the scheduler and worker pool monitor. Worker
//! tasks are drained before the process exits.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
/// If the SIGTERM handler cannot be installed, only Ctrl+C is watched.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, watching Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for `handles` to finish, then aborts the rest.
///
/// Returns how many tasks had to be aborted. Jobs held by aborted tasks stay
/// claimed in the queue until their visibility timeout lapses.
pub async fn drain_tasks(handles: Vec<JoinHandle<()>>, timeout: Duration) -> usize {
    if handles.is_empty() {
        info!("no worker tasks to drain");
        return 0;
    }

    info!(count = handles.len(), "waiting for worker tasks to finish");

    let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
    let all = join_all(handles);

    match tokio::time::timeout(timeout, all).await {
        Ok(()) => {
            info!("all worker tasks drained");
            0
        }
        Err(_) => {
            let remaining = aborts.iter().filter(|a| !a.is_finished()).count();
            for abort in &aborts {
                abort.abort();
            }
            warn!(remaining, "drain timeout reached, aborting worker tasks");
            remaining
        }
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await
            && e.is_panic()
        {
            warn!(error = %e, "worker task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        // Token should not be cancelled yet.
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_empty_task_list() {
        assert_eq!(drain_tasks(Vec::new(), Duration::from_millis(10)).await, 0);
    }

    #[tokio::test]
    async fn finished_tasks_drain_cleanly() {
        let handles = (0..3)
            .map(|_| tokio::spawn(async { tokio::time::sleep(Duration::from_millis(5)).await }))
            .collect();
        assert_eq!(drain_tasks(handles, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_tasks_are_aborted_after_timeout() {
        let quick = tokio::spawn(async {});
        let stuck = tokio::spawn(async { std::future::pending::<()>().await });
        let aborted = drain_tasks(vec![quick, stuck], Duration::from_secs(1)).await;
        assert_eq!(aborted, 1);
    }
}
