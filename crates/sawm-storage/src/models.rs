// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model re-exports and column codecs.
//!
//! The canonical types live in `sawm-core::types`. The helpers here decode
//! TEXT columns (timestamps, JSON, enum names) inside rusqlite row closures,
//! reporting failures as `FromSqlConversionFailure` for the offending column.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use tracing::warn;

pub use sawm_core::types::{
    DeviceToken, FastStatus, FastingSession, NewFastingSession, NewNotification,
    NotificationRecord, QueueEntry, ReminderLedgerEntry,
};

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Read a required RFC 3339 timestamp column.
pub fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

/// Read a nullable RFC 3339 timestamp column.
pub fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

/// Read a session's `prayer_times` column.
///
/// Non-string entries are dropped. A column that is not a JSON array reads
/// as an empty list so one bad row cannot fail a whole candidate scan.
pub fn prayer_times_column(
    row: &Row<'_>,
    idx: usize,
    fast_id: i64,
) -> rusqlite::Result<Vec<String>> {
    let raw: Option<String> = row.get(idx)?;
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        Err(e) => {
            warn!(fast_id, error = %e, "unreadable prayer_times, treating as empty");
            Ok(Vec::new())
        }
    }
}

/// Read a JSON object of string values.
pub fn string_map_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<BTreeMap<String, String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<FastStatus> {
    let raw: String = row.get(idx)?;
    FastStatus::from_str(&raw).map_err(|e| conversion_error(idx, e))
}
