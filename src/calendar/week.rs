use super::hours::TimeRange;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Working,
    NonWorking,
    /// Defer to the parent calendar, or Mon-Fri working when there is none.
    #[default]
    Default,
}

/// Day types and hour ranges for each weekday, indexed from Monday.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeekDefinition {
    pub day_types: [DayType; 7],
    pub hours: [Vec<TimeRange>; 7],
}

impl WeekDefinition {
    /// Mon-Fri working with `hours`, weekend non-working.
    pub fn working_weekdays(hours: &[TimeRange]) -> Self {
        let mut week = Self::default();
        for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            week.set_day(weekday, DayType::Working, hours.to_vec());
        }
        week.set_day_type(Weekday::Sat, DayType::NonWorking);
        week.set_day_type(Weekday::Sun, DayType::NonWorking);
        week
    }

    pub fn day_type(&self, weekday: Weekday) -> DayType {
        self.day_types[weekday.num_days_from_monday() as usize]
    }

    pub fn hours(&self, weekday: Weekday) -> &[TimeRange] {
        &self.hours[weekday.num_days_from_monday() as usize]
    }

    pub fn set_day_type(&mut self, weekday: Weekday, day_type: DayType) {
        self.day_types[weekday.num_days_from_monday() as usize] = day_type;
    }

    /// Hours are kept ordered by start time.
    pub fn set_hours(&mut self, weekday: Weekday, mut hours: Vec<TimeRange>) {
        hours.sort_by_key(TimeRange::start_ms);
        self.hours[weekday.num_days_from_monday() as usize] = hours;
    }

    pub fn set_day(&mut self, weekday: Weekday, day_type: DayType, hours: Vec<TimeRange>) {
        self.set_day_type(weekday, day_type);
        self.set_hours(weekday, hours);
    }
}

/// An alternate week pattern that applies between two dates, inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkWeek {
    pub name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub definition: WeekDefinition,
}

impl WorkWeek {
    pub fn new(
        name: impl Into<String>,
        from: NaiveDate,
        to: NaiveDate,
        definition: WeekDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            definition,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}
