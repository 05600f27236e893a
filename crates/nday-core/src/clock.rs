//! Time source used to decide what "today" is.
//!
//! Bury dates are calendar days, so every component asks a [`Clock`] for the
//! current day rather than reading the system time directly.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    /// Current instant, used for `created_at` stamps.
    fn now(&self) -> DateTime<Utc>;

    /// Current scheduling day.
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the local timezone with a day-rollover hour.
///
/// With `rollover_hour = 4`, 02:30 on the 11th still counts as the 10th.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    rollover_hour: u32,
}

impl SystemClock {
    pub fn new(rollover_hour: u32) -> Self {
        Self {
            rollover_hour: rollover_hour.min(23),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        (Local::now() - Duration::hours(i64::from(self.rollover_hour))).date_naive()
    }
}

/// Manually driven clock for tests and for replaying a given day.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon UTC on `date`, so `today()` returns `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
            .and_utc();
        Self::new(noon)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut guard = self.lock();
        *guard += Duration::days(days);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A panic while holding this lock cannot leave the timestamp half-written.
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }

    fn today(&self) -> NaiveDate {
        self.lock().date_naive()
    }
}
