use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Upper bound on the dates a single rule may expand to.
pub const MAX_OCCURRENCES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    Daily { frequency: u32 },
    /// Every `frequency`-th weekday, counting Monday to Friday only.
    DailyWorkday { frequency: u32 },
    Weekly { frequency: u32, days: Vec<Weekday> },
    /// Fixed day of the month; days past the month's end clamp to its last day.
    MonthlyAbsolute { frequency: u32, day: u32 },
    MonthlyRelative { frequency: u32, ordinal: Ordinal, day: Weekday },
    YearlyAbsolute { month: u32, day: u32 },
    YearlyRelative { ordinal: Ordinal, day: Weekday, month: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceEnd {
    Occurrences(u32),
    /// Last date on which an occurrence may fall, inclusive.
    Until(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringData {
    pub start: NaiveDate,
    pub pattern: RecurrencePattern,
    pub end: RecurrenceEnd,
}

impl RecurringData {
    pub fn new(start: NaiveDate, pattern: RecurrencePattern, end: RecurrenceEnd) -> Self {
        Self { start, pattern, end }
    }

    /// Every date the rule produces, ascending, none earlier than `start`.
    pub fn occurrences(&self) -> Vec<NaiveDate> {
        let limit = match self.end {
            RecurrenceEnd::Occurrences(count) => (count as usize).min(MAX_OCCURRENCES),
            RecurrenceEnd::Until(_) => MAX_OCCURRENCES,
        };
        let until = match self.end {
            RecurrenceEnd::Until(date) => Some(date),
            RecurrenceEnd::Occurrences(_) => None,
        };

        if let RecurrencePattern::Weekly { days, .. } = &self.pattern {
            if days.is_empty() {
                return Vec::new();
            }
        }

        let mut dates = Vec::new();
        let mut period = 0u32;
        while dates.len() < limit {
            let Some(candidates) = self.period_dates(period) else {
                break;
            };
            for date in candidates {
                if date < self.start {
                    continue;
                }
                if until.is_some_and(|until| date > until) || dates.len() >= limit {
                    return dates;
                }
                dates.push(date);
            }
            period = match period.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
        dates
    }

    /// Candidate dates for the `period`-th repetition, ascending. `None`
    /// once the rule runs off the representable date range or is malformed.
    fn period_dates(&self, period: u32) -> Option<Vec<NaiveDate>> {
        let start = self.start;
        match &self.pattern {
            RecurrencePattern::Daily { frequency } => {
                let offset = i64::from(period) * i64::from(effective_frequency(*frequency));
                Some(vec![start.checked_add_signed(Duration::days(offset))?])
            }
            RecurrencePattern::DailyWorkday { frequency } => {
                let steps = i64::from(period) * i64::from(effective_frequency(*frequency));
                Some(vec![add_weekdays(start, steps)?])
            }
            RecurrencePattern::Weekly { frequency, days } => {
                let week_start =
                    start - Duration::days(i64::from(start.weekday().num_days_from_monday()));
                let offset = 7 * i64::from(period) * i64::from(effective_frequency(*frequency));
                let week_start = week_start.checked_add_signed(Duration::days(offset))?;
                let mut offsets: Vec<u32> = days.iter().map(|d| d.num_days_from_monday()).collect();
                offsets.sort_unstable();
                offsets.dedup();
                offsets
                    .into_iter()
                    .map(|o| week_start.checked_add_signed(Duration::days(i64::from(o))))
                    .collect()
            }
            RecurrencePattern::MonthlyAbsolute { frequency, day } => {
                let (year, month) = shift_month(start, period, effective_frequency(*frequency))?;
                Some(vec![clamped_day(year, month, *day)?])
            }
            RecurrencePattern::MonthlyRelative { frequency, ordinal, day } => {
                let (year, month) = shift_month(start, period, effective_frequency(*frequency))?;
                Some(vec![nth_weekday(year, month, *ordinal, *day)?])
            }
            RecurrencePattern::YearlyAbsolute { month, day } => {
                let year = start.year().checked_add(i32::try_from(period).ok()?)?;
                Some(vec![clamped_day(year, *month, *day)?])
            }
            RecurrencePattern::YearlyRelative { ordinal, day, month } => {
                let year = start.year().checked_add(i32::try_from(period).ok()?)?;
                Some(vec![nth_weekday(year, *month, *ordinal, *day)?])
            }
        }
    }
}

fn effective_frequency(frequency: u32) -> u32 {
    frequency.max(1)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The weekday `count` weekdays after the first weekday on or after `start`.
fn add_weekdays(start: NaiveDate, count: i64) -> Option<NaiveDate> {
    let mut date = start;
    while is_weekend(date) {
        date = date.succ_opt()?;
    }
    date = date.checked_add_signed(Duration::days(count / 5 * 7))?;
    let mut remaining = count % 5;
    while remaining > 0 {
        date = date.succ_opt()?;
        if !is_weekend(date) {
            remaining -= 1;
        }
    }
    Some(date)
}

fn shift_month(start: NaiveDate, period: u32, frequency: u32) -> Option<(i32, u32)> {
    let months = i64::from(period) * i64::from(frequency);
    let total = i64::from(start.year()) * 12 + i64::from(start.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    (28..=31)
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(year, month, day))
}

fn clamped_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = last_day_of_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last.day()))
}

fn nth_weekday(year: i32, month: u32, ordinal: Ordinal, weekday: Weekday) -> Option<NaiveDate> {
    let n = match ordinal {
        Ordinal::First => 1,
        Ordinal::Second => 2,
        Ordinal::Third => 3,
        Ordinal::Fourth => 4,
        Ordinal::Last => {
            let last = last_day_of_month(year, month)?;
            let back =
                (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
            return Some(last - Duration::days(i64::from(back)));
        }
    };
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}
