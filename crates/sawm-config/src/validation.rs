// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive intervals, and well-formed URLs.

use crate::diagnostic::ConfigError;
use crate::model::SawmConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SawmConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(validation(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty"));
    }

    if config.scheduler.tick_interval_secs == 0 {
        errors.push(validation("scheduler.tick_interval_secs must be at least 1"));
    }

    if config.queue.name.trim().is_empty() {
        errors.push(validation("queue.name must not be empty"));
    }

    if config.queue.max_attempts == 0 {
        errors.push(validation("queue.max_attempts must be at least 1"));
    }

    if config.queue.visibility_timeout_secs == 0 {
        errors.push(validation("queue.visibility_timeout_secs must be at least 1"));
    }

    if config.worker.concurrency == 0 {
        errors.push(validation("worker.concurrency must be at least 1"));
    }

    if config.push.timeout_secs == 0 {
        errors.push(validation("push.timeout_secs must be at least 1"));
    }

    // A hung push call must not outlive the job's claim, or the job is
    // redelivered while still running.
    if config.push.timeout_secs >= config.queue.visibility_timeout_secs {
        errors.push(validation(format!(
            "push.timeout_secs ({}) must be shorter than queue.visibility_timeout_secs ({})",
            config.push.timeout_secs, config.queue.visibility_timeout_secs
        )));
    }

    if let Some(endpoint) = &config.push.endpoint {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            errors.push(validation(format!(
                "push.endpoint `{endpoint}` must be an http:// or https:// URL"
            )));
        }
    }

    if config.push.permanent_error_codes.is_empty() {
        errors.push(validation(
            "push.permanent_error_codes must list at least one error code",
        ));
    }

    for (i, code) in config.push.permanent_error_codes.iter().enumerate() {
        if code.trim().is_empty() {
            errors.push(validation(format!(
                "push.permanent_error_codes[{i}] must not be empty"
            )));
        }
    }

    if config.reminder.title.trim().is_empty() {
        errors.push(validation("reminder.title must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
