// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder candidate selection.
//!
//! Pure: maps the active sessions read at the start of a tick and the tick's
//! slot to the jobs that should be enqueued. Malformed `prayer_times` entries
//! are dropped here without error.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use sawm_config::model::ReminderConfig;
use sawm_core::types::{FastingSession, ReminderJob, ReminderSlot};

static TIME_ENTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").unwrap());

/// Whether a `prayer_times` entry has the `HH:MM` shape.
pub fn is_time_entry(entry: &str) -> bool {
    TIME_ENTRY.is_match(entry)
}

/// One job per `(session, matching prayer_times entry)`.
///
/// Sessions are expected to be active with reminders enabled; the flags are
/// re-checked so the function stays correct for any input. Duplicate
/// matching entries in one session yield duplicate jobs; the ledger
/// collapses them downstream.
pub fn select_candidates(
    sessions: &[FastingSession],
    slot: &ReminderSlot,
    reminder: &ReminderConfig,
) -> Vec<ReminderJob> {
    sessions
        .iter()
        .filter(|s| s.reminder_enabled && s.status == sawm_core::FastStatus::Active)
        .flat_map(|session| {
            session
                .prayer_times
                .iter()
                .filter(move |entry| is_time_entry(entry) && **entry == slot.time_key)
                .map(move |_| build_job(session, slot, reminder))
        })
        .collect()
}

fn build_job(
    session: &FastingSession,
    slot: &ReminderSlot,
    reminder: &ReminderConfig,
) -> ReminderJob {
    let body = match session.prayer_focus.as_deref().map(str::trim) {
        Some(focus) if !focus.is_empty() => {
            format!("It's {}. Take a moment to pray. Focus: {focus}", slot.time_key)
        }
        _ => format!("It's {}. Take a moment to pray.", slot.time_key),
    };

    let mut data = BTreeMap::new();
    data.insert("type".to_string(), reminder.notification_type.clone());
    data.insert("fastId".to_string(), session.id.to_string());
    data.insert("time".to_string(), slot.time_key.clone());

    ReminderJob {
        fast_id: session.id,
        user_id: session.user_id,
        date_key: slot.date_key.clone(),
        time_key: slot.time_key.clone(),
        title: reminder.title.clone(),
        body,
        data,
    }
}
