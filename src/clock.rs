//! Time sources.
//!
//! Upgrade timers and offline gaps are measured against wall-clock UTC.
//! Everything that needs "now" takes a `Clock` so tests can drive time by hand.

use std::cell::Cell;

use chrono::{DateTime, Duration, Utc};

/// Supplies the current wall-clock time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Real UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and the headless simulator
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    /// Move the clock forward (or backward for negative input) by fractional seconds
    pub fn advance_secs(&self, secs: f64) {
        self.now.set(saturating_offset(self.now.get(), secs));
    }

    pub fn advance_hours(&self, hours: f64) {
        self.advance_secs(hours * 3600.0);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Signed seconds between two instants, with sub-second precision
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

/// Convert fractional seconds to a chrono duration (millisecond resolution).
///
/// Out-of-range input saturates; NaN is zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    let ms = (secs * 1000.0).round() as i64;
    Duration::milliseconds(ms.max(-i64::MAX))
}

/// `at` shifted by `secs`, or `None` past the representable date range
pub fn checked_offset(at: DateTime<Utc>, secs: f64) -> Option<DateTime<Utc>> {
    at.checked_add_signed(secs_to_duration(secs))
}

/// `at` shifted by `secs`, pinned to the first or last representable instant
pub fn saturating_offset(at: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    checked_offset(at, secs).unwrap_or(if secs < 0.0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
