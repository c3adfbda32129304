// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock push adapter for deterministic testing.
//!
//! `MockPushAdapter` implements `PushAdapter`, capturing every delivery for
//! assertion and answering with scripted outcomes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Barrier, Mutex};

use sawm_core::traits::adapter::PluginAdapter;
use sawm_core::traits::push::PushAdapter;
use sawm_core::types::{AdapterType, DeliveryOutcome, HealthStatus, PushMessage, UserId};
use sawm_core::SawmError;

/// A recording push adapter.
///
/// By default every delivery succeeds with one outcome for the token
/// `"mock-token"`.
pub struct MockPushAdapter {
    sent: Mutex<Vec<(UserId, PushMessage)>>,
    outcomes: Mutex<Vec<DeliveryOutcome>>,
    error: Option<String>,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
}

impl MockPushAdapter {
    /// Create a mock that reports every delivery as successful.
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            outcomes: Mutex::new(vec![DeliveryOutcome::delivered("mock-token")]),
            error: None,
            delay: None,
            barrier: None,
        }
    }

    /// Answer every delivery with `outcomes`.
    pub fn with_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            ..Self::new()
        }
    }

    /// Fail every delivery as a whole with a push error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new()
        }
    }

    /// Sleep before answering. Pair with a short push timeout to simulate a
    /// hung provider.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Wait on `barrier` before answering, so concurrent workers are held
    /// inside the push step together.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Every `(user_id, message)` passed to `deliver`.
    pub async fn sent(&self) -> Vec<(UserId, PushMessage)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockPushAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockPushAdapter {
    fn name(&self) -> &str {
        "mock-push"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
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
impl PushAdapter for MockPushAdapter {
    async fn deliver(
        &self,
        user_id: UserId,
        message: &PushMessage,
    ) -> Result<Vec<DeliveryOutcome>, SawmError> {
        self.sent.lock().await.push((user_id, message.clone()));

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.error {
            return Err(SawmError::Push {
                message: message.clone(),
                source: None,
            });
        }
        Ok(self.outcomes.lock().await.clone())
    }
}
