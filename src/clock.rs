use chrono::{Local, NaiveDate, NaiveDateTime};
use std::sync::{Arc, RwLock};

/// Source of "now". Every date-relative rule (streaks, recent logs, week labels)
/// reads the calendar through this trait so it can be pinned in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Process local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    /// Noon on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set(date.and_hms_opt(12, 0, 0).unwrap_or_default());
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 12).expect("date");
        let clock = FixedClock::on(start);
        assert_eq!(clock.today(), start);

        let shared = clock.clone();
        shared.set_date(start.succ_opt().expect("next day"));
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2024, 1, 13).expect("date")
        );
    }
}
