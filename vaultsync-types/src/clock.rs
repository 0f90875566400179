//! Time sources.
//!
//! Replicas never call `Utc::now()` directly; they ask their [`Clock`]. Tests
//! swap in a [`ManualClock`] so that "a second later" is exact and
//! reproducible.

use chrono::{DateTime, Duration, Months, TimeZone, Utc};
use std::fmt;
use std::sync::Mutex;

/// A source of UTC instants.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Creates a clock frozen at the given calendar instant.
    ///
    /// Out-of-range components fall back to the Unix epoch.
    #[must_use]
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        let start = Utc
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .unwrap_or_default();
        Self::new(start)
    }

    /// Moves the clock to `time`.
    pub fn set(&self, time: DateTime<Utc>) {
        *self.lock() = time;
    }

    /// Moves the clock forward and returns the new instant.
    pub fn advance(&self, delta: Duration) -> DateTime<Utc> {
        let mut current = self.lock();
        *current += delta;
        *current
    }

    pub fn advance_millis(&self, millis: i64) -> DateTime<Utc> {
        self.advance(Duration::milliseconds(millis))
    }

    pub fn advance_seconds(&self, seconds: i64) -> DateTime<Utc> {
        self.advance(Duration::seconds(seconds))
    }

    pub fn advance_minutes(&self, minutes: i64) -> DateTime<Utc> {
        self.advance(Duration::minutes(minutes))
    }

    pub fn advance_hours(&self, hours: i64) -> DateTime<Utc> {
        self.advance(Duration::hours(hours))
    }

    pub fn advance_days(&self, days: i64) -> DateTime<Utc> {
        self.advance(Duration::days(days))
    }

    /// Moves the clock forward by whole calendar years.
    pub fn advance_years(&self, years: u32) -> DateTime<Utc> {
        let mut current = self.lock();
        if let Some(next) = current.checked_add_months(Months::new(years * 12)) {
            *current = next;
        }
        *current
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid instant.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
