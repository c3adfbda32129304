// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock per-token push transport.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sawm_core::traits::adapter::PluginAdapter;
use sawm_core::traits::push::PushTransport;
use sawm_core::types::{AdapterType, DeliveryOutcome, DeviceToken, HealthStatus, PushMessage};
use sawm_core::SawmError;

/// Delivers to every token except those scripted with an error code.
#[derive(Default)]
pub struct MockTransport {
    errors: Mutex<HashMap<String, String>>,
    sent: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `token` fail with provider error `code`.
    pub async fn reject(&self, token: &str, code: &str) {
        self.errors
            .lock()
            .await
            .insert(token.to_string(), code.to_string());
    }

    /// Tokens sent to, in call order.
    pub async fn sent_tokens(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::PushTransport
    }

    async fn health_check(&self) -> Result<HealthStatus, SawmError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SawmError> {
        Ok(())
    }
}

#[async_trait]
impl PushTransport for MockTransport {
    async fn send(
        &self,
        token: &DeviceToken,
        _message: &PushMessage,
    ) -> Result<DeliveryOutcome, SawmError> {
        self.sent.lock().await.push(token.token.clone());
        match self.errors.lock().await.get(&token.token) {
            Some(code) => Ok(DeliveryOutcome::failed(&token.token, Some(code.clone()))),
            None => Ok(DeliveryOutcome::delivered(&token.token)),
        }
    }
}
