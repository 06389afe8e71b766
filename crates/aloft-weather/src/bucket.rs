//! Time buckets: the forecast's nominal validity time.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// A UTC timestamp truncated to a minute granularity.
///
/// The string form is fixed-width and zero-padded, so buckets are directly
/// usable as map keys and sort lexicographically in time order. Two
/// instants inside the same granularity window produce byte-identical
/// buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeBucket(String);

impl TimeBucket {
    /// Truncate `now` to the nearest lower multiple of the granularity.
    ///
    /// Minutes are floor-divided (never rounded), seconds are always zero.
    pub fn truncate(now: DateTime<Utc>, granularity_minutes: u32) -> Self {
        let granularity = granularity_minutes.max(1);
        let minute = now.minute() / granularity * granularity;
        Self::from_parts(now.year(), now.month(), now.day(), now.hour(), minute)
    }

    pub fn from_parts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self(format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:00Z",
            year, month, day, hour, minute
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn truncates_minutes_and_zeroes_seconds() {
        let bucket = TimeBucket::truncate(utc(2024, 1, 15, 12, 34, 56), 5);
        assert_eq!(bucket.as_str(), "2024-01-15T12:30:00Z");
    }

    #[test]
    fn idempotent_within_one_window() {
        let a = TimeBucket::truncate(utc(2024, 1, 15, 12, 30, 0), 5);
        let b = TimeBucket::truncate(utc(2024, 1, 15, 12, 34, 59), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn windows_are_half_open() {
        let a = TimeBucket::truncate(utc(2024, 1, 15, 12, 34, 59), 5);
        let b = TimeBucket::truncate(utc(2024, 1, 15, 12, 35, 0), 5);
        assert_ne!(a, b);
        assert_eq!(b.as_str(), "2024-01-15T12:35:00Z");
    }

    #[test]
    fn pads_all_fields() {
        let bucket = TimeBucket::truncate(utc(2024, 3, 5, 9, 7, 2), 5);
        assert_eq!(bucket.as_str(), "2024-03-05T09:05:00Z");
    }

    #[test]
    fn hourly_granularity_zeroes_minutes() {
        let bucket = TimeBucket::truncate(utc(2024, 1, 15, 12, 59, 59), 60);
        assert_eq!(bucket.as_str(), "2024-01-15T12:00:00Z");
    }

    #[test]
    fn granularity_not_dividing_sixty_uses_floor_division() {
        let bucket = TimeBucket::truncate(utc(2024, 1, 15, 12, 13, 0), 7);
        assert_eq!(bucket.as_str(), "2024-01-15T12:07:00Z");

        let bucket = TimeBucket::truncate(utc(2024, 1, 15, 12, 59, 0), 7);
        assert_eq!(bucket.as_str(), "2024-01-15T12:56:00Z");
    }

    #[test]
    fn buckets_sort_lexicographically_in_time_order() {
        let earlier = TimeBucket::truncate(utc(2024, 1, 15, 9, 0, 0), 5);
        let later = TimeBucket::truncate(utc(2024, 1, 15, 12, 0, 0), 5);
        assert!(earlier < later);
        assert!(earlier.as_str() < later.as_str());
    }
}
