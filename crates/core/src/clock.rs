// SPDX-License-Identifier: MIT

//! Clock abstraction for testable time handling, plus the timestamp
//! formatting and host-identity helpers the lock and snapshot protocols
//! build on.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time, both as a monotonic instant
/// (for uptime/elapsed measurements) and as wall-clock UTC (for anything
/// that gets written to a replicated file and read back on another host).
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;

    fn utc_now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.epoch_ms() as i64).unwrap_or_else(Utc::now)
    }
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
    epoch_ms: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
            epoch_ms: Arc::new(Mutex::new(1_700_000_000_000)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
        *self.epoch_ms.lock() += duration.as_millis() as u64;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        *self.current.lock() = instant;
    }

    /// Set the epoch milliseconds value.
    pub fn set_epoch_ms(&self, ms: u64) {
        *self.epoch_ms.lock() = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }

    fn epoch_ms(&self) -> u64 {
        *self.epoch_ms.lock()
    }
}

/// Stable identifier for the current machine, used as the `hostname`
/// field of a lock record. Falls back to `"unknown"` rather than failing
/// a caller that only needs a best-effort label.
pub fn host_id() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|s| s.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format an instant as ISO-8601 UTC with millisecond precision, the
/// wire format used by the lock file and log timestamps.
pub fn format_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp, tolerating both a `Z` suffix and an
/// explicit numeric offset. A bare (offset-less) timestamp is assumed
/// to already be UTC, mirroring how naive timestamps were historically
/// written to the lock file.
pub fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Age of a timestamp, in seconds, relative to `now`. A timestamp that
/// fails to parse is treated as infinitely old so callers that compare
/// against a stale threshold correctly treat it as stale.
pub fn age_seconds(raw: &str, now: DateTime<Utc>) -> f64 {
    match parse_iso(raw) {
        Some(ts) => (now - ts).num_milliseconds() as f64 / 1000.0,
        None => f64::INFINITY,
    }
}

/// Local-time filename timestamp used for snapshot archive names:
/// `YYYY-MM-DD_HH-MM-SS`. Deliberately local time, not UTC, matching
/// how operators read backup directory listings at a glance.
pub fn backup_timestamp(now: DateTime<Utc>) -> String {
    DateTime::<Local>::from(now).format("%Y-%m-%d_%H-%M-%S").to_string()
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
