// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable at-least-once job queue.
//!
//! Entries move `pending -> processing -> completed`, or back to `pending`
//! with exponential backoff on failure until `max_attempts` is reached and
//! the entry becomes `failed`. A `processing` entry whose `locked_until`
//! has passed is treated as abandoned (crashed worker) and is redelivered.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row, TransactionBehavior};
use sawm_core::clock::format_timestamp;
use sawm_core::SawmError;

use crate::database::Database;
use crate::models::QueueEntry;

/// Shift cap for the backoff exponent.
const MAX_BACKOFF_SHIFT: u32 = 16;

const ENTRY_COLUMNS: &str = "id, queue_name, payload, status, attempts, max_attempts, \
     available_at, locked_until, last_error, created_at, updated_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        payload: row.get(2)?,
        status: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        available_at: row.get(6)?,
        locked_until: row.get(7)?,
        last_error: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn offset(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Delay before retry number `attempts` (1-based): `base * 2^(attempts - 1)`.
pub fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    let shift = attempts.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    base.saturating_mul(1u32 << shift)
}

/// Enqueue a new item. Returns the auto-generated queue entry ID.
///
/// The row is committed before this returns; a crash afterwards cannot lose it.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    max_attempts: u32,
    now: DateTime<Utc>,
) -> Result<i64, SawmError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO job_queue
                    (queue_name, payload, status, attempts, max_attempts,
                     available_at, created_at, updated_at)
                 VALUES (?1, ?2, 'pending', 0, ?3, ?4, ?4, ?4)",
                params![queue_name, payload, max_attempts, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim the next deliverable entry from the named queue.
///
/// Runs in an IMMEDIATE transaction so two processes can never claim the
/// same row. Deliverable means `pending` and due, or `processing` with an
/// expired lock. Reclaiming an expired lock counts as an attempt; entries
/// that have no attempts left are marked `failed` instead of redelivered.
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    now: DateTime<Utc>,
    visibility: Duration,
) -> Result<Option<QueueEntry>, SawmError> {
    let queue_name = queue_name.to_string();
    let locked_until = format_timestamp(offset(now, visibility));
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            tx.execute(
                "UPDATE job_queue
                 SET status = 'failed', attempts = attempts + 1, locked_until = NULL,
                     last_error = COALESCE(last_error, 'visibility timeout expired'),
                     updated_at = ?2
                 WHERE queue_name = ?1 AND status = 'processing'
                   AND locked_until < ?2 AND attempts + 1 >= max_attempts",
                params![queue_name, now],
            )?;

            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM job_queue
                 WHERE queue_name = ?1
                   AND ((status = 'pending' AND available_at <= ?2)
                        OR (status = 'processing' AND locked_until < ?2))
                 ORDER BY available_at ASC, id ASC
                 LIMIT 1"
            );
            let claimed = match tx.query_row(&sql, params![queue_name, now], entry_from_row) {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE job_queue
                         SET attempts = attempts + CASE WHEN status = 'processing' THEN 1 ELSE 0 END,
                             status = 'processing', locked_until = ?2, updated_at = ?3
                         WHERE id = ?1",
                        params![entry.id, locked_until, now],
                    )?;
                    let sql = format!("SELECT {ENTRY_COLUMNS} FROM job_queue WHERE id = ?1");
                    Some(tx.query_row(&sql, params![entry.id], entry_from_row)?)
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e),
            };

            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful processing of a queue entry.
pub async fn ack(db: &Database, id: i64, now: DateTime<Utc>) -> Result<(), SawmError> {
    let now = format_timestamp(now);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE job_queue
                 SET status = 'completed', locked_until = NULL,
                     updated_at = ?2
                 WHERE id = ?1",
                params![id, now],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(missing_entry(id));
    }
    Ok(())
}

fn missing_entry(id: i64) -> SawmError {
    SawmError::NotFound {
        entity: "queue entry",
        id: id.to_string(),
    }
}

/// Record a failed attempt.
///
/// Increments attempts. At `max_attempts` the entry becomes `failed`;
/// otherwise it returns to `pending` and becomes available again after
/// [`backoff_delay`].
pub async fn fail(
    db: &Database,
    id: i64,
    error: &str,
    now: DateTime<Utc>,
    backoff_base: Duration,
) -> Result<(), SawmError> {
    let error = error.to_string();
    let found = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let (attempts, max_attempts): (u32, u32) = match tx.query_row(
                "SELECT attempts, max_attempts FROM job_queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            ) {
                Ok(pair) => pair,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
                Err(e) => return Err(e),
            };

            let new_attempts = attempts + 1;
            let now_str = format_timestamp(now);
            if new_attempts >= max_attempts {
                tx.execute(
                    "UPDATE job_queue
                     SET status = 'failed', attempts = ?1, locked_until = NULL,
                         last_error = ?2, updated_at = ?3
                     WHERE id = ?4",
                    params![new_attempts, error, now_str, id],
                )?;
            } else {
                let available_at =
                    format_timestamp(offset(now, backoff_delay(backoff_base, new_attempts)));
                tx.execute(
                    "UPDATE job_queue
                     SET status = 'pending', attempts = ?1, locked_until = NULL,
                         available_at = ?2, last_error = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![new_attempts, available_at, error, now_str, id],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if !found {
        return Err(missing_entry(id));
    }
    Ok(())
}

/// Entries still owed work: `pending` or `processing`.
pub async fn queue_depth(db: &Database, queue_name: &str) -> Result<i64, SawmError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM job_queue
                 WHERE queue_name = ?1 AND status IN ('pending', 'processing')",
                params![queue_name],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one entry by id.
pub async fn get_entry(db: &Database, id: i64) -> Result<Option<QueueEntry>, SawmError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {ENTRY_COLUMNS} FROM job_queue WHERE id = ?1");
            match conn.query_row(&sql, params![id], entry_from_row) {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
