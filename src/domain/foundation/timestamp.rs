//! Timestamp value object for immutable points in time.
//!
//! Billing periods are whole calendar days, so alongside the instant type
//! this module exposes `today()` and `yesterday()` in UTC.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the calendar date of this instant.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Today's calendar date in UTC.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Yesterday's calendar date in UTC.
    pub fn yesterday() -> NaiveDate {
        Self::today() - Duration::days(1)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn add_days_moves_the_date() {
        let dt = DateTime::parse_from_rfc3339("2024-01-30T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ts = Timestamp::from_datetime(dt).add_days(3);
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
    }

    #[test]
    fn yesterday_is_one_day_before_today() {
        assert_eq!(Timestamp::today() - Timestamp::yesterday(), Duration::days(1));
    }

    #[test]
    fn timestamp_deserializes_from_json() {
        let json = "\"2024-01-15T10:30:00Z\"";
        let ts: Timestamp = serde_json::from_str(json).unwrap();

        assert_eq!(ts.as_datetime().year(), 2024);
    }

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::now();
        let later = earlier.add_days(1);
        assert!(earlier.is_before(&later));
        assert!(earlier < later);
    }
}
