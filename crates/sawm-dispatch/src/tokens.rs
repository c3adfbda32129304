// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token health: deactivation of permanently invalid and stale device tokens.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sawm_config::model::PushConfig;
use sawm_core::types::DeliveryOutcome;
use sawm_core::{SawmError, StorageAdapter};
use tracing::{info, warn};

pub struct TokenHealthManager {
    storage: Arc<dyn StorageAdapter>,
    permanent_codes: HashSet<String>,
    stale_after: Option<Duration>,
}

impl TokenHealthManager {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        permanent_codes: impl IntoIterator<Item = String>,
        stale_after: Option<Duration>,
    ) -> Self {
        Self {
            storage,
            permanent_codes: permanent_codes.into_iter().collect(),
            stale_after,
        }
    }

    pub fn from_config(storage: Arc<dyn StorageAdapter>, config: &PushConfig) -> Self {
        let stale_after =
            (config.stale_token_days > 0).then(|| Duration::days(i64::from(config.stale_token_days)));
        Self::new(storage, config.permanent_error_codes.iter().cloned(), stale_after)
    }

    /// Whether `code` marks a token as permanently unusable.
    pub fn is_permanent(&self, code: &str) -> bool {
        self.permanent_codes.contains(code)
    }

    /// Deactivate every token whose outcome carries a permanent error code.
    ///
    /// Returns the tokens this call actually switched off. Tokens with other
    /// failures, and successful tokens, are left alone.
    pub async fn apply_outcomes(
        &self,
        outcomes: &[DeliveryOutcome],
    ) -> Result<Vec<String>, SawmError> {
        let mut deactivated = Vec::new();
        for outcome in outcomes.iter().filter(|o| !o.success) {
            let Some(code) = outcome.error_code.as_deref() else {
                continue;
            };
            if !self.is_permanent(code) {
                continue;
            }
            if self.storage.deactivate_token(&outcome.token).await? {
                info!(code, "device token deactivated");
                deactivated.push(outcome.token.clone());
            }
        }
        Ok(deactivated)
    }

    /// Deactivate tokens not seen within the stale window. No-op when pruning
    /// is disabled.
    pub async fn prune_stale(&self, now: DateTime<Utc>) -> Result<u64, SawmError> {
        let Some(window) = self.stale_after else {
            return Ok(0);
        };
        let Some(cutoff) = now.checked_sub_signed(window) else {
            warn!("stale token cutoff out of range, skipping prune");
            return Ok(0);
        };
        let pruned = self.storage.deactivate_stale_tokens(cutoff).await?;
        if pruned > 0 {
            info!(pruned, "stale device tokens deactivated");
        }
        Ok(pruned)
    }
}
