// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sawm reminder engine.

use thiserror::Error;

/// The primary error type used across all Sawm adapter traits and engine operations.
///
/// Ledger uniqueness conflicts are deliberately absent: they are reported as
/// [`LedgerInsert::AlreadyRecorded`](crate::types::LedgerInsert) instead.
#[derive(Debug, Error)]
pub enum SawmError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Push delivery adapter errors (transport failure, unexpected response).
    #[error("push error: {message}")]
    Push {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A job payload could not be encoded or decoded.
    #[error("payload error: {source}")]
    Payload {
        #[from]
        source: serde_json::Error,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SawmError {
    /// Whether the failure is infrastructure-level and may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SawmError::Storage { .. } | SawmError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let storage = SawmError::Storage {
            source: Box::new(std::io::Error::other("locked")),
        };
        let timeout = SawmError::Timeout {
            duration: std::time::Duration::from_secs(1),
        };
        assert!(storage.is_transient());
        assert!(timeout.is_transient());
        assert!(!SawmError::Config("bad".into()).is_transient());
        assert!(!SawmError::Internal("bug".into()).is_transient());
        let missing = SawmError::NotFound {
            entity: "queue entry",
            id: "7".into(),
        };
        assert!(!missing.is_transient());
        assert_eq!(missing.to_string(), "queue entry not found: 7");
    }

    #[test]
    fn payload_error_converts_from_serde() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: SawmError = err.into();
        assert!(matches!(err, SawmError::Payload { .. }));
        assert!(err.to_string().starts_with("payload error"));
    }
}
