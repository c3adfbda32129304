// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push delivery for the Sawm reminder engine.
//!
//! [`FanoutPushAdapter`] implements the worker-facing `PushAdapter` on top of
//! a per-token [`PushTransport`](sawm_core::PushTransport): either the HTTP
//! gateway client or the log-only dry-run transport.

pub mod dry_run;
pub mod fanout;
pub mod http;

use std::sync::Arc;

use sawm_config::model::PushConfig;
use sawm_core::{PushAdapter, PushTransport, SawmError, StorageAdapter};
use tracing::info;

pub use dry_run::LogPushTransport;
pub use fanout::FanoutPushAdapter;
pub use http::HttpPushTransport;

/// Pick the transport from config and wrap it in a fan-out adapter.
///
/// With no `push.endpoint` configured, pushes are logged instead of sent.
pub fn build_push_adapter(
    config: &PushConfig,
    storage: Arc<dyn StorageAdapter>,
) -> Result<Arc<dyn PushAdapter>, SawmError> {
    let transport: Arc<dyn PushTransport> = match HttpPushTransport::from_config(config)? {
        Some(http) => {
            info!(endpoint = config.endpoint.as_deref().unwrap_or_default(), "push transport: http");
            Arc::new(http)
        }
        None => {
            info!("push transport: log (no endpoint configured)");
            Arc::new(LogPushTransport)
        }
    };
    Ok(Arc::new(FanoutPushAdapter::new(storage, transport)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sawm_core::PluginAdapter;
    use sawm_storage::{Database, SqliteStorage};

    #[tokio::test]
    async fn unconfigured_push_uses_fanout_over_log_transport() {
        let storage = Arc::new(SqliteStorage::from_database(
            Database::open_in_memory().await.unwrap(),
        ));
        let adapter = build_push_adapter(&PushConfig::default(), storage).unwrap();
        assert_eq!(adapter.name(), "fanout-push");
    }

    #[test]
    fn bad_auth_header_is_a_config_error() {
        let config = PushConfig {
            endpoint: Some("https://push.example.com".into()),
            auth_token: Some("line\nbreak".into()),
            ..PushConfig::default()
        };
        // Transport construction fails before storage is touched.
        let err = HttpPushTransport::from_config(&config).unwrap_err();
        assert!(matches!(err, SawmError::Config(_)));
    }
}
