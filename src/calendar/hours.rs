use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DAY_MS: i64 = 86_400_000;
pub const MS_PER_MINUTE: i64 = 60_000;

/// A span of working time within a single day.
///
/// An `end` at or before `start` means the range runs past midnight into
/// the following calendar day; `00:00-00:00` is a full 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build a range from hours and minutes. Values wrap at midnight, so
    /// `from_hm(22, 0, 24, 0)` ends at 00:00 the next day.
    pub fn from_hm(start_hour: u32, start_minute: u32, end_hour: u32, end_minute: u32) -> Self {
        Self::new(
            Self::time_of_day(start_hour, start_minute),
            Self::time_of_day(end_hour, end_minute),
        )
    }

    pub fn time_of_day(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::MIN + Duration::minutes(i64::from(hour) * 60 + i64::from(minute))
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Offset of the range start from midnight.
    pub fn start_ms(&self) -> i64 {
        ms_of_day(self.start)
    }

    /// Offset of the range end from the midnight that starts the range's
    /// day; exceeds `DAY_MS` for midnight-crossing ranges.
    pub fn end_ms(&self) -> i64 {
        let end = ms_of_day(self.end);
        if self.crosses_midnight() {
            end + DAY_MS
        } else {
            end
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms() - self.start_ms()
    }

    /// Length of the intersection with `[from_ms, to_ms]`.
    pub fn overlap_ms(&self, from_ms: i64, to_ms: i64) -> i64 {
        let start = self.start_ms().max(from_ms);
        let end = self.end_ms().min(to_ms);
        (end - start).max(0)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

pub fn ms_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * 1000 + i64::from(time.nanosecond() / 1_000_000)
}

pub(crate) fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// The instant `ms` milliseconds after the start of `date`.
pub(crate) fn at_ms(date: NaiveDate, ms: i64) -> NaiveDateTime {
    day_start(date) + Duration::milliseconds(ms)
}

pub(crate) fn total_ms(ranges: &[TimeRange]) -> i64 {
    ranges.iter().map(TimeRange::duration_ms).sum()
}

pub(crate) fn window_ms(ranges: &[TimeRange], from_ms: i64, to_ms: i64) -> i64 {
    if from_ms >= to_ms {
        return 0;
    }
    ranges.iter().map(|range| range.overlap_ms(from_ms, to_ms)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midnight_crossing_range_extends_past_day_end() {
        let night = TimeRange::from_hm(22, 0, 2, 0);
        assert!(night.crosses_midnight());
        assert_eq!(night.start_ms(), 22 * 3_600_000);
        assert_eq!(night.end_ms(), 26 * 3_600_000);
        assert_eq!(night.duration_ms(), 4 * 3_600_000);
    }

    #[test]
    fn full_day_range_is_twenty_four_hours() {
        let all_day = TimeRange::from_hm(0, 0, 24, 0);
        assert_eq!(all_day.duration_ms(), DAY_MS);
    }

    #[test]
    fn window_sums_partial_overlaps() {
        let ranges = [TimeRange::from_hm(8, 0, 12, 0), TimeRange::from_hm(13, 0, 17, 0)];
        let from = 10 * 3_600_000;
        let to = 14 * 3_600_000;
        assert_eq!(window_ms(&ranges, from, to), 3 * 3_600_000);
        assert_eq!(window_ms(&ranges, to, from), 0);
        assert_eq!(total_ms(&ranges), 8 * 3_600_000);
    }

    #[test]
    fn displays_as_clock_span() {
        assert_eq!(TimeRange::from_hm(8, 30, 12, 0).to_string(), "08:30-12:00");
    }
}
