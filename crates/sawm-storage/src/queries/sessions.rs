// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store: creation, lookup, bulk lifecycle transitions and the
//! reminder candidate read.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use sawm_core::clock::format_timestamp;
use sawm_core::{FastId, SawmError};

use crate::database::Database;
use crate::models::{
    optional_timestamp_column, prayer_times_column, status_column, timestamp_column,
    FastingSession, NewFastingSession,
};

const SESSION_COLUMNS: &str = "id, user_id, status, start_time, end_time, completed_at, \
     reminder_enabled, prayer_times, prayer_focus";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<FastingSession> {
    let id: i64 = row.get(0)?;
    Ok(FastingSession {
        id,
        user_id: row.get(1)?,
        status: status_column(row, 2)?,
        start_time: timestamp_column(row, 3)?,
        end_time: timestamp_column(row, 4)?,
        completed_at: optional_timestamp_column(row, 5)?,
        reminder_enabled: row.get(6)?,
        prayer_times: prayer_times_column(row, 7, id)?,
        prayer_focus: row.get(8)?,
    })
}

/// Create a new session in the `upcoming` state. Returns its id.
pub async fn create_session(
    db: &Database,
    session: &NewFastingSession,
    now: DateTime<Utc>,
) -> Result<FastId, SawmError> {
    let prayer_times = serde_json::to_string(&session.prayer_times)?;
    let session = session.clone();
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO fasting_sessions
                    (user_id, status, start_time, end_time, reminder_enabled,
                     prayer_times, prayer_focus, created_at, updated_at)
                 VALUES (?1, 'upcoming', ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    session.user_id,
                    format_timestamp(session.start_time),
                    format_timestamp(session.end_time),
                    session.reminder_enabled,
                    prayer_times,
                    session.prayer_focus,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: FastId) -> Result<Option<FastingSession>, SawmError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM fasting_sessions WHERE id = ?1");
            match conn.query_row(&sql, params![id], session_from_row) {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `upcoming -> active` for every session whose start time has passed.
///
/// A single set-based UPDATE; rows already transitioned no longer match the
/// predicate, so re-running with the same `now` changes nothing.
pub async fn activate_due_sessions(db: &Database, now: DateTime<Utc>) -> Result<u64, SawmError> {
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE fasting_sessions
                 SET status = 'active', updated_at = ?1
                 WHERE status = 'upcoming' AND start_time <= ?1",
                params![now],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `active -> completed` for every session whose end time has passed,
/// stamping `completed_at` in the same statement.
pub async fn complete_due_sessions(db: &Database, now: DateTime<Utc>) -> Result<u64, SawmError> {
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE fasting_sessions
                 SET status = 'completed', completed_at = ?1, updated_at = ?1
                 WHERE status = 'active' AND end_time <= ?1",
                params![now],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active sessions with reminders enabled, in id order.
pub async fn list_reminder_candidates(db: &Database) -> Result<Vec<FastingSession>, SawmError> {
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM fasting_sessions
                 WHERE status = 'active' AND reminder_enabled = 1
                 ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], session_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
