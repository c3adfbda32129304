// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-app notification records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use sawm_core::clock::format_timestamp;
use sawm_core::{SawmError, UserId};

use crate::database::Database;
use crate::models::{
    optional_timestamp_column, string_map_column, timestamp_column, NewNotification,
    NotificationRecord,
};

/// Insert a notification. Returns its id.
pub async fn create_notification(
    db: &Database,
    notification: &NewNotification,
    now: DateTime<Utc>,
) -> Result<i64, SawmError> {
    let data = serde_json::to_string(&notification.data)?;
    let notification = notification.clone();
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notifications (user_id, type, title, body, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    notification.user_id,
                    notification.kind,
                    notification.title,
                    notification.body,
                    data,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A user's notifications, oldest first.
pub async fn list_notifications(
    db: &Database,
    user_id: UserId,
) -> Result<Vec<NotificationRecord>, SawmError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, type, title, body, data, read_at, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(NotificationRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    kind: row.get(2)?,
                    title: row.get(3)?,
                    body: row.get(4)?,
                    data: string_map_column(row, 5)?,
                    read_at: optional_timestamp_column(row, 6)?,
                    created_at: timestamp_column(row, 7)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn reminder(user_id: UserId) -> NewNotification {
        let mut data = BTreeMap::new();
        data.insert("fastId".to_string(), "7".to_string());
        data.insert("time".to_string(), "14:30".to_string());
        NewNotification {
            user_id,
            kind: "fast_prayer_reminder".into(),
            title: "Prayer reminder".into(),
            body: "It's 14:30, time to pause and pray.".into(),
            data,
        }
    }

    #[tokio::test]
    async fn create_and_list_notifications() {
        let db = Database::open_in_memory().await.unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 1).unwrap();

        let id = create_notification(&db, &reminder(3), now).await.unwrap();
        create_notification(&db, &reminder(4), now).await.unwrap();

        let list = list_notifications(&db, 3).await.unwrap();
        assert_eq!(list.len(), 1);
        let n = &list[0];
        assert_eq!(n.id, id);
        assert_eq!(n.kind, "fast_prayer_reminder");
        assert_eq!(n.data.get("fastId").map(String::as_str), Some("7"));
        assert_eq!(n.read_at, None);
        assert_eq!(n.created_at, now);
    }

    #[tokio::test]
    async fn list_for_unknown_user_is_empty() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(list_notifications(&db, 99).await.unwrap().is_empty());
    }
}
