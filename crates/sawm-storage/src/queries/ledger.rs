// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder dedup ledger.
//!
//! The `UNIQUE (fast_id, date_key, time_key)` key is what makes a reminder
//! exactly-once. Inserts are plain INSERTs; a uniqueness violation is
//! reported as [`LedgerInsert::AlreadyRecorded`], never as an error.

use rusqlite::{params, ErrorCode, Row};
use sawm_core::clock::format_timestamp;
use sawm_core::{FastId, LedgerInsert, SawmError};

use crate::database::Database;
use crate::models::{timestamp_column, ReminderLedgerEntry};

fn ledger_from_row(row: &Row<'_>) -> rusqlite::Result<ReminderLedgerEntry> {
    Ok(ReminderLedgerEntry {
        fast_id: row.get(0)?,
        user_id: row.get(1)?,
        date_key: row.get(2)?,
        time_key: row.get(3)?,
        sent_at: timestamp_column(row, 4)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Look up the ledger row for one reminder slot.
pub async fn find_ledger_entry(
    db: &Database,
    fast_id: FastId,
    date_key: &str,
    time_key: &str,
) -> Result<Option<ReminderLedgerEntry>, SawmError> {
    let date_key = date_key.to_string();
    let time_key = time_key.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT fast_id, user_id, date_key, time_key, sent_at
                 FROM reminder_ledger
                 WHERE fast_id = ?1 AND date_key = ?2 AND time_key = ?3",
                params![fast_id, date_key, time_key],
                ledger_from_row,
            );
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a ledger row. Exactly one concurrent caller per slot observes
/// [`LedgerInsert::Recorded`].
pub async fn insert_ledger_entry(
    db: &Database,
    entry: &ReminderLedgerEntry,
) -> Result<LedgerInsert, SawmError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO reminder_ledger (fast_id, user_id, date_key, time_key, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.fast_id,
                    entry.user_id,
                    entry.date_key,
                    entry.time_key,
                    format_timestamp(entry.sent_at),
                ],
            );
            match result {
                Ok(_) => Ok(LedgerInsert::Recorded),
                Err(e) if is_unique_violation(&e) => Ok(LedgerInsert::AlreadyRecorded),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All ledger rows for a session, oldest slot first.
pub async fn list_ledger_entries(
    db: &Database,
    fast_id: FastId,
) -> Result<Vec<ReminderLedgerEntry>, SawmError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT fast_id, user_id, date_key, time_key, sent_at
                 FROM reminder_ledger
                 WHERE fast_id = ?1
                 ORDER BY date_key ASC, time_key ASC",
            )?;
            let rows = stmt.query_map(params![fast_id], ledger_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn entry(fast_id: FastId, time_key: &str) -> ReminderLedgerEntry {
        ReminderLedgerEntry {
            fast_id,
            user_id: 9,
            date_key: "2024-01-01".into(),
            time_key: time_key.into(),
            sent_at: Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 2).unwrap(),
        }
    }

    #[tokio::test]
    async fn first_insert_records_second_conflicts() {
        let (db, _dir) = setup_db().await;

        assert_eq!(
            insert_ledger_entry(&db, &entry(1, "14:30")).await.unwrap(),
            LedgerInsert::Recorded
        );
        assert_eq!(
            insert_ledger_entry(&db, &entry(1, "14:30")).await.unwrap(),
            LedgerInsert::AlreadyRecorded
        );
        assert_eq!(list_ledger_entries(&db, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn distinct_slots_do_not_conflict() {
        let (db, _dir) = setup_db().await;

        insert_ledger_entry(&db, &entry(1, "05:10")).await.unwrap();
        insert_ledger_entry(&db, &entry(1, "14:30")).await.unwrap();
        insert_ledger_entry(&db, &entry(2, "14:30")).await.unwrap();

        let mut next_day = entry(1, "14:30");
        next_day.date_key = "2024-01-02".into();
        assert_eq!(
            insert_ledger_entry(&db, &next_day).await.unwrap(),
            LedgerInsert::Recorded
        );

        let rows = list_ledger_entries(&db, 1).await.unwrap();
        let keys: Vec<_> = rows
            .iter()
            .map(|r| format!("{} {}", r.date_key, r.time_key))
            .collect();
        assert_eq!(keys, vec!["2024-01-01 05:10", "2024-01-01 14:30", "2024-01-02 14:30"]);
    }

    #[tokio::test]
    async fn find_returns_recorded_row() {
        let (db, _dir) = setup_db().await;
        assert!(
            find_ledger_entry(&db, 1, "2024-01-01", "14:30")
                .await
                .unwrap()
                .is_none()
        );

        insert_ledger_entry(&db, &entry(1, "14:30")).await.unwrap();
        let found = find_ledger_entry(&db, 1, "2024-01-01", "14:30")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, entry(1, "14:30"));
    }

    #[tokio::test]
    async fn concurrent_inserts_record_exactly_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("race.db");
        let path = path.to_str().unwrap();

        // Two independent connections, as two worker processes would have.
        let a = Database::open(path).await.unwrap();
        let b = Database::open(path).await.unwrap();

        let entry_a = entry(5, "14:30");
        let entry_b = entry(5, "14:30");
        let (ra, rb) = tokio::join!(
            insert_ledger_entry(&a, &entry_a),
            insert_ledger_entry(&b, &entry_b),
        );
        let mut results = vec![ra.unwrap(), rb.unwrap()];
        results.sort_by_key(|r| *r == LedgerInsert::AlreadyRecorded);
        assert_eq!(
            results,
            vec![LedgerInsert::Recorded, LedgerInsert::AlreadyRecorded]
        );
    }
}
