// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sawm - prayer-time reminder dispatch for fasting sessions.
//!
//! This is the binary entry point for the Sawm engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sawm_config::{ConfigError, SawmConfig};

/// Sawm - prayer-time reminder dispatch for fasting sessions.
#[derive(Parser, Debug)]
#[command(name = "sawm", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the tick scheduler and the worker pool until interrupted.
    Serve,
    /// Run exactly one scheduler tick and print what it did.
    Tick {
        /// Tick as if the clock read this RFC 3339 instant.
        #[arg(long)]
        at: Option<String>,
    },
    /// Run only the worker pool.
    Worker,
    /// Load and validate configuration, then exit.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<SawmConfig, Vec<ConfigError>> {
    match path {
        Some(path) => sawm_config::load_and_validate_path(path),
        None => sawm_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            sawm_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Tick { at }) => serve::run_tick(config, at.as_deref()).await,
        Some(Commands::Worker) => serve::run_worker(config).await,
        Some(Commands::CheckConfig) => {
            println!(
                "sawm: config ok (database={}, queue={})",
                config.storage.database_path, config.queue.name
            );
            Ok(())
        }
        None => {
            println!("sawm: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("sawm: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = sawm_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.service.name, "sawm");
        assert_eq!(config.queue.name, "prayer-reminders");
    }

    #[test]
    fn tick_subcommand_parses_at() {
        let cli = Cli::parse_from(["sawm", "tick", "--at", "2024-01-01T14:30:00Z"]);
        match cli.command {
            Some(Commands::Tick { at }) => assert_eq!(at.as_deref(), Some("2024-01-01T14:30:00Z")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn check_config_is_kebab_case() {
        let cli = Cli::parse_from(["sawm", "--config", "/tmp/sawm.toml", "check-config"]);
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sawm.toml")));
    }
}
