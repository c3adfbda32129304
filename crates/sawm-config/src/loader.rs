// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sawm.toml` > `~/.config/sawm/sawm.toml` > `/etc/sawm/sawm.toml`
//! with environment variable overrides via `SAWM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SawmConfig;

/// Section names recognised in `SAWM_<SECTION>_<KEY>` environment variables.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "scheduler",
    "queue",
    "worker",
    "push",
    "reminder",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sawm/sawm.toml` (system-wide)
/// 3. `~/.config/sawm/sawm.toml` (user XDG config)
/// 4. `./sawm.toml` (local directory)
/// 5. `SAWM_*` environment variables
pub fn load_config() -> Result<SawmConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SawmConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SawmConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SawmConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SawmConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SawmConfig::default()))
        .merge(Toml::file("/etc/sawm/sawm.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sawm/sawm.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sawm.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `SAWM_STORAGE_DATABASE_PATH` must map to `storage.database_path`,
/// not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("SAWM_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
