// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! Within one process all statements are serialized through tokio-rusqlite's
//! single background thread. Separate processes (horizontally scaled workers)
//! open their own `Database` on the same file and rely on SQLite's locking,
//! bounded by `busy_timeout`.

use std::path::Path;
use std::time::Duration;

use sawm_config::model::StorageConfig;
use sawm_core::SawmError;
use tracing::debug;

use crate::migrations;

/// Connection options applied on open.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseOptions {
    pub wal_mode: bool,
    pub busy_timeout: Duration,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            wal_mode: true,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl From<&StorageConfig> for DatabaseOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            wal_mode: config.wal_mode,
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }
}

/// Handle to a migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` with default options.
    pub async fn open(path: &str) -> Result<Self, SawmError> {
        Self::open_with(path, DatabaseOptions::default()).await
    }

    /// Open the database at `path`, apply PRAGMAs and run pending migrations.
    pub async fn open_with(path: &str, options: DatabaseOptions) -> Result<Self, SawmError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SawmError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SawmError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(options).await?;
        debug!(path, wal = options.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database. WAL is not applicable.
    pub async fn open_in_memory() -> Result<Self, SawmError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| SawmError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(DatabaseOptions {
            wal_mode: false,
            ..DatabaseOptions::default()
        })
        .await?;
        Ok(db)
    }

    async fn prepare(&self, options: DatabaseOptions) -> Result<(), SawmError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.busy_timeout(options.busy_timeout)?;
                if options.wal_mode {
                    let _mode: String = conn.pragma_update_and_check(
                        None,
                        "journal_mode",
                        "WAL",
                        |row| row.get(0),
                    )?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(map_tr_err)
    }

    /// The underlying async connection. Query modules call through this.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn close(&self) -> Result<(), SawmError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into `SawmError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SawmError {
    SawmError::Storage {
        source: Box::new(e),
    }
}
