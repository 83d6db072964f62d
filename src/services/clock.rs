use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;

/// Source of "now" for fetch windows and cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an instant; set by `AS_OF_DATE` for reproducible runs.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    #[cfg(test)]
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        assert_eq!(clock.now().date_naive(), NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());

        clock.advance(chrono::Duration::days(2));
        assert_eq!(clock.now().date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }
}
