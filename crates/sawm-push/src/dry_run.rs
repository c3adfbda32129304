// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dry-run transport used when no push endpoint is configured.

use async_trait::async_trait;
use tracing::info;

use sawm_core::types::{DeliveryOutcome, DeviceToken, PushMessage};
use sawm_core::{AdapterType, HealthStatus, PluginAdapter, PushTransport, SawmError};

/// Logs each push instead of sending it, and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPushTransport;

#[async_trait]
impl PluginAdapter for LogPushTransport {
    fn name(&self) -> &str {
        "log-push"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::PushTransport
    }

    async fn health_check(&self) -> Result<HealthStatus, SawmError> {
        Ok(HealthStatus::Degraded(
            "no push endpoint configured, reminders are only logged".into(),
        ))
    }

    async fn shutdown(&self) -> Result<(), SawmError> {
        Ok(())
    }
}

#[async_trait]
impl PushTransport for LogPushTransport {
    async fn send(
        &self,
        token: &DeviceToken,
        message: &PushMessage,
    ) -> Result<DeliveryOutcome, SawmError> {
        info!(
            user_id = token.user_id,
            platform = %token.platform,
            title = %message.title,
            body = %message.body,
            "push (dry run)"
        );
        Ok(DeliveryOutcome::delivered(&token.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_degraded_and_delivers() {
        assert!(matches!(
            LogPushTransport.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));

        let token = DeviceToken {
            user_id: 3,
            token: "tok".into(),
            platform: "ios".into(),
            is_active: true,
            last_active_at: chrono::Utc::now(),
        };
        let message = PushMessage {
            title: "Prayer reminder".into(),
            body: "It's 14:30".into(),
            data: Default::default(),
        };
        let outcome = LogPushTransport.send(&token, &message).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::delivered("tok"));
    }
}
