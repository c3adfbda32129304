// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injectable clock source and the canonical timestamp encoding.
//!
//! Every timestamp written to storage uses the fixed-width form
//! `YYYY-MM-DDTHH:MM:SS.mmmZ`, so lexical ordering in SQL matches time
//! ordering.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::SawmError;

/// Source of the current instant.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for deterministic ticks in tests and one-shot runs.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = instant;
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Encode an instant in the storage timestamp format.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SawmError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SawmError::Internal(format!("invalid timestamp `{raw}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances_and_shares_state() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();

        clock.advance(Duration::seconds(45));
        assert_eq!(shared.now(), Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 45).unwrap());

        shared.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn timestamp_format_is_fixed_width() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();
        assert_eq!(format_timestamp(t), "2024-01-01T09:05:00.000Z");
        assert_eq!(parse_timestamp("2024-01-01T09:05:00.000Z").unwrap(), t);
    }

    #[test]
    fn parse_normalizes_offsets_to_utc() {
        let parsed = parse_timestamp("2024-01-01T17:30:00+03:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 0).unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }
}
