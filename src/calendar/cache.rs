use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Result of the most recent forward date walk, reused when the next call
/// continues from the same start with more work to consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DateWalkMemo {
    pub start: NaiveDateTime,
    pub minutes: f64,
    pub result: NaiveDateTime,
}

/// Derived values memoized per calendar. Cleared on any structural change
/// to the calendar or one of its ancestors.
#[derive(Debug, Default)]
pub(crate) struct CalendarCache {
    pub working_ms: HashMap<(NaiveDateTime, NaiveDateTime), i64>,
    pub start_times: HashMap<NaiveDate, i64>,
    pub last_walk: Option<DateWalkMemo>,
}

impl CalendarCache {
    pub fn clear(&mut self) {
        self.working_ms.clear();
        self.start_times.clear();
        self.last_walk = None;
    }

    pub fn is_empty(&self) -> bool {
        self.working_ms.is_empty() && self.start_times.is_empty() && self.last_walk.is_none()
    }
}
