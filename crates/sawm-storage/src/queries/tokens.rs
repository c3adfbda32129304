// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device token registry.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use sawm_core::clock::format_timestamp;
use sawm_core::{SawmError, UserId};

use crate::database::Database;
use crate::models::{timestamp_column, DeviceToken};

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceToken> {
    Ok(DeviceToken {
        user_id: row.get(0)?,
        token: row.get(1)?,
        platform: row.get(2)?,
        is_active: row.get(3)?,
        last_active_at: timestamp_column(row, 4)?,
    })
}

/// Insert or update a token, keyed by the token string.
pub async fn register_device_token(db: &Database, token: &DeviceToken) -> Result<(), SawmError> {
    let token = token.clone();
    db.connection()
        .call(move |conn| {
            let last_active = format_timestamp(token.last_active_at);
            conn.execute(
                "INSERT INTO device_tokens
                    (user_id, token, platform, is_active, last_active_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(token) DO UPDATE SET
                    user_id = excluded.user_id,
                    platform = excluded.platform,
                    is_active = excluded.is_active,
                    last_active_at = excluded.last_active_at",
                params![
                    token.user_id,
                    token.token,
                    token.platform,
                    token.is_active,
                    last_active,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_device_token(db: &Database, token: &str) -> Result<Option<DeviceToken>, SawmError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT user_id, token, platform, is_active, last_active_at
                 FROM device_tokens WHERE token = ?1",
                params![token],
                token_from_row,
            ) {
                Ok(t) => Ok(Some(t)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active tokens for a user, in registration order.
pub async fn list_active_tokens(
    db: &Database,
    user_id: UserId,
) -> Result<Vec<DeviceToken>, SawmError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, token, platform, is_active, last_active_at
                 FROM device_tokens
                 WHERE user_id = ?1 AND is_active = 1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], token_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Switch a token off. Returns `true` only if it was active.
pub async fn deactivate_token(db: &Database, token: &str) -> Result<bool, SawmError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE device_tokens SET is_active = 0 WHERE token = ?1 AND is_active = 1",
                params![token],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Deactivate every active token last seen before `cutoff`.
pub async fn deactivate_stale_tokens(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<u64, SawmError> {
    let cutoff = format_timestamp(cutoff);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE device_tokens SET is_active = 0
                 WHERE is_active = 1 AND last_active_at < ?1",
                params![cutoff],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn token(user_id: UserId, value: &str, last_active_at: DateTime<Utc>) -> DeviceToken {
        DeviceToken {
            user_id,
            token: value.into(),
            platform: "android".into(),
            is_active: true,
            last_active_at,
        }
    }

    #[tokio::test]
    async fn register_is_an_upsert() {
        let db = Database::open_in_memory().await.unwrap();
        register_device_token(&db, &token(1, "tok-a", now())).await.unwrap();

        let mut moved = token(2, "tok-a", now() + Duration::days(1));
        moved.platform = "ios".into();
        register_device_token(&db, &moved).await.unwrap();

        let stored = get_device_token(&db, "tok-a").await.unwrap().unwrap();
        assert_eq!(stored, moved);
        assert!(list_active_tokens(&db, 1).await.unwrap().is_empty());
        assert_eq!(list_active_tokens(&db, 2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deactivate_reports_only_real_transitions() {
        let db = Database::open_in_memory().await.unwrap();
        register_device_token(&db, &token(1, "tok-a", now())).await.unwrap();
        register_device_token(&db, &token(1, "tok-b", now())).await.unwrap();

        assert!(deactivate_token(&db, "tok-a").await.unwrap());
        assert!(!deactivate_token(&db, "tok-a").await.unwrap());
        assert!(!deactivate_token(&db, "missing").await.unwrap());

        let active = list_active_tokens(&db, 1).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].token, "tok-b");
        assert!(!get_device_token(&db, "tok-a").await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn stale_tokens_are_deactivated_by_cutoff() {
        let db = Database::open_in_memory().await.unwrap();
        register_device_token(&db, &token(1, "old", now() - Duration::days(90)))
            .await
            .unwrap();
        register_device_token(&db, &token(1, "fresh", now() - Duration::days(3)))
            .await
            .unwrap();

        let cutoff = now() - Duration::days(60);
        assert_eq!(deactivate_stale_tokens(&db, cutoff).await.unwrap(), 1);
        assert_eq!(deactivate_stale_tokens(&db, cutoff).await.unwrap(), 0);

        let active = list_active_tokens(&db, 1).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].token, "fresh");
    }
}
