// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push delivery traits.
//!
//! [`PushAdapter`] is the capability the reminder worker depends on: deliver
//! one message to every device a user has registered. [`PushTransport`] is the
//! narrower per-token seam that concrete providers implement.

use async_trait::async_trait;

use crate::error::SawmError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{DeliveryOutcome, DeviceToken, PushMessage, UserId};

/// Fan-out delivery of a notification to a user's devices.
#[async_trait]
pub trait PushAdapter: PluginAdapter {
    /// Deliver `message` to all active tokens of `user_id`.
    ///
    /// Per-token failures are reported as outcomes, not as `Err`. An `Err`
    /// means the adapter could not attempt delivery at all.
    async fn deliver(
        &self,
        user_id: UserId,
        message: &PushMessage,
    ) -> Result<Vec<DeliveryOutcome>, SawmError>;
}

/// Sends a message to exactly one device token.
#[async_trait]
pub trait PushTransport: PluginAdapter {
    async fn send(
        &self,
        token: &DeviceToken,
        message: &PushMessage,
    ) -> Result<DeliveryOutcome, SawmError>;
}
