// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user fan-out over registered device tokens.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use sawm_core::types::{DeliveryOutcome, PushMessage};
use sawm_core::{
    AdapterType, HealthStatus, PluginAdapter, PushAdapter, PushTransport, SawmError,
    StorageAdapter, UserId,
};

/// [`PushAdapter`] that resolves a user's active tokens from storage and
/// hands each one to a [`PushTransport`].
///
/// A transport error for one token becomes a failed outcome with no error
/// code; it never aborts delivery to the remaining tokens.
pub struct FanoutPushAdapter {
    storage: Arc<dyn StorageAdapter>,
    transport: Arc<dyn PushTransport>,
}

impl FanoutPushAdapter {
    pub fn new(storage: Arc<dyn StorageAdapter>, transport: Arc<dyn PushTransport>) -> Self {
        Self { storage, transport }
    }
}

#[async_trait]
impl PluginAdapter for FanoutPushAdapter {
    fn name(&self) -> &str {
        "fanout-push"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Push
    }

    async fn health_check(&self) -> Result<HealthStatus, SawmError> {
        self.transport.health_check().await
    }

    async fn shutdown(&self) -> Result<(), SawmError> {
        self.transport.shutdown().await
    }
}

#[async_trait]
impl PushAdapter for FanoutPushAdapter {
    async fn deliver(
        &self,
        user_id: UserId,
        message: &PushMessage,
    ) -> Result<Vec<DeliveryOutcome>, SawmError> {
        let tokens = self.storage.list_active_tokens(user_id).await?;
        if tokens.is_empty() {
            debug!(user_id, "no active device tokens");
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match self.transport.send(token, message).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(user_id, error = %e, "push transport failed for token");
                    outcomes.push(DeliveryOutcome::failed(&token.token, None));
                }
            }
        }
        debug!(
            user_id,
            tokens = tokens.len(),
            delivered = outcomes.iter().filter(|o| o.success).count(),
            "push fan-out complete"
        );
        Ok(outcomes)
    }
}
