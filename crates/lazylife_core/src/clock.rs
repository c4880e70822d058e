//! Time source port.
//!
//! # Responsibility
//! - Provide every time read in core (entity timestamps, debounce and
//!   cool-down deadlines, "today" for date-keyed completion).
//!
//! # Invariants
//! - `now_ms` is Unix epoch milliseconds.
//! - `today` is the caller's local calendar date, not UTC.

use crate::model::date_key::DateKey;
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Injected time source.
pub trait Clock: Send + Sync {
    /// Epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Local calendar date for "today" defaults.
    fn today(&self) -> DateKey;

    /// ISO-8601 UTC timestamp (`2024-01-01T08:30:00.000Z`).
    fn now_iso8601(&self) -> String {
        iso8601_from_ms(self.now_ms())
    }
}

/// Wall-clock implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> DateKey {
        DateKey::from(Local::now().date_naive())
    }
}

/// Settable clock for deterministic timer tests and replays.
///
/// `today` is derived from `now_ms` in UTC so tests never depend on the host
/// time zone.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn today(&self) -> DateKey {
        let now = datetime_from_ms(self.now_ms());
        DateKey::from(now.date_naive())
    }
}

/// Formats epoch milliseconds as an ISO-8601 UTC timestamp.
pub fn iso8601_from_ms(ms: i64) -> String {
    datetime_from_ms(ms).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 / ISO-8601 timestamp into epoch milliseconds.
pub fn ms_from_iso8601(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|parsed| parsed.timestamp_millis())
}

fn datetime_from_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{iso8601_from_ms, ms_from_iso8601, Clock, ManualClock};

    #[test]
    fn manual_clock_advances_and_derives_today() {
        let clock = ManualClock::new(1_704_067_200_000);
        assert_eq!(clock.today().as_str(), "2024-01-01");
        clock.advance(86_400_000);
        assert_eq!(clock.today().as_str(), "2024-01-02");
        assert_eq!(clock.now_ms(), 1_704_153_600_000);
    }

    #[test]
    fn iso8601_roundtrips_through_epoch_ms() {
        let text = iso8601_from_ms(1_704_067_200_123);
        assert_eq!(text, "2024-01-01T00:00:00.123Z");
        assert_eq!(ms_from_iso8601(&text), Some(1_704_067_200_123));
        assert_eq!(ms_from_iso8601("yesterday"), None);
    }
}
