// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Sawm configuration system.

use sawm_config::diagnostic::ConfigError;
use sawm_config::model::SawmConfig;
use sawm_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_sawm_config() {
    let toml = r#"
[service]
name = "reminders-eu"
log_level = "debug"

[storage]
database_path = "/tmp/sawm-test.db"
wal_mode = false
busy_timeout_ms = 250

[scheduler]
enabled = true
tick_interval_secs = 30
align_to_minute = false

[queue]
name = "reminders"
max_attempts = 3
backoff_base_ms = 100
visibility_timeout_secs = 120

[worker]
enabled = false
concurrency = 8
poll_interval_ms = 50

[push]
endpoint = "https://push.example.com/send"
auth_token = "secret"
timeout_secs = 5
permanent_error_codes = ["gone"]
stale_token_days = 0

[reminder]
title = "Time to pray"
notification_type = "prayer"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "reminders-eu");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/sawm-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.scheduler.tick_interval_secs, 30);
    assert!(!config.scheduler.align_to_minute);
    assert_eq!(config.queue.name, "reminders");
    assert_eq!(config.queue.max_attempts, 3);
    assert_eq!(config.queue.backoff_base_ms, 100);
    assert_eq!(config.queue.visibility_timeout_secs, 120);
    assert!(!config.worker.enabled);
    assert_eq!(config.worker.concurrency, 8);
    assert_eq!(
        config.push.endpoint.as_deref(),
        Some("https://push.example.com/send")
    );
    assert_eq!(config.push.permanent_error_codes, vec!["gone"]);
    assert_eq!(config.push.stale_token_days, 0);
    assert_eq!(config.reminder.title, "Time to pray");
    assert_eq!(config.reminder.notification_type, "prayer");

    assert!(load_and_validate_str(toml).is_ok());
}

/// Unknown field in [worker] section produces an error naming the bad key.
#[test]
fn unknown_field_in_worker_produces_error() {
    let toml = r#"
[worker]
concurency = 4
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("concurency"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Diagnostics suggest the closest valid key.
#[test]
fn unknown_key_diagnostic_carries_suggestion() {
    let toml = r#"
[scheduler]
tick_interval_sec = 60
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { suggestion, .. } => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("tick_interval_secs"));
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "sawm");
    assert_eq!(config.service.log_level, "info");
    assert!(config.storage.wal_mode);
    assert_eq!(config.scheduler.tick_interval_secs, 60);
    assert!(config.scheduler.align_to_minute);
    assert_eq!(config.queue.name, "prayer-reminders");
    assert_eq!(config.queue.max_attempts, 5);
    assert_eq!(config.queue.visibility_timeout_secs, 300);
    assert_eq!(config.worker.concurrency, 2);
    assert!(config.push.endpoint.is_none());
    assert_eq!(config.push.timeout_secs, 10);
    assert!(
        config
            .push
            .permanent_error_codes
            .iter()
            .any(|c| c == "messaging/registration-token-not-registered")
    );
    assert_eq!(config.reminder.notification_type, "fast_prayer_reminder");
}

/// Dotted keys (what the env provider produces) override file values.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: SawmConfig = Figment::new()
        .merge(Serialized::defaults(SawmConfig::default()))
        .merge(Toml::string("[storage]\ndatabase_path = \"from-toml.db\"\n"))
        .merge(("storage.database_path", "from-env.db"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.storage.database_path, "from-env.db");
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: SawmConfig = Figment::new()
        .merge(Serialized::defaults(SawmConfig::default()))
        .merge(Toml::file("/nonexistent/path/sawm.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.service.name, "sawm");
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[worker]
concurrency = 0

[scheduler]
tick_interval_secs = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// Wrong value types are reported as InvalidType with the dotted key.
#[test]
fn wrong_type_reports_invalid_type() {
    let toml = r#"
[queue]
max_attempts = "many"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::InvalidType { key, .. } if key == "queue.max_attempts"
    )));
}
