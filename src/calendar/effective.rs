use super::exception::CalendarException;
use super::hours::{self, TimeRange};
use super::registry::CalendarRegistry;
use super::week::{DayType, WorkWeek};
use super::{CalendarId, WorkCalendar};
use crate::duration::UnitSettings;
use crate::metadata::TimeDefaults;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A registered calendar viewed together with its ancestors and the
/// project defaults.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveCalendar<'a> {
    registry: &'a CalendarRegistry,
    calendar: &'a WorkCalendar,
}

impl<'a> EffectiveCalendar<'a> {
    pub(crate) fn new(registry: &'a CalendarRegistry, calendar: &'a WorkCalendar) -> Self {
        Self { registry, calendar }
    }

    pub fn id(&self) -> CalendarId {
        self.calendar.id()
    }

    pub fn calendar(&self) -> &'a WorkCalendar {
        self.calendar
    }

    pub fn defaults(&self) -> &'a TimeDefaults {
        self.registry.defaults()
    }

    pub fn parent(&self) -> Option<EffectiveCalendar<'a>> {
        let parent = self.registry.get(self.calendar.parent()?)?;
        Some(Self::new(self.registry, parent))
    }

    /// Day type resolved through the parent chain; a calendar with no
    /// parent treats `Default` as Mon-Fri working.
    pub fn is_working_day(&self, weekday: Weekday) -> bool {
        match self.calendar.week().day_type(weekday) {
            DayType::Working => true,
            DayType::NonWorking => false,
            DayType::Default => match self.parent() {
                Some(parent) => parent.is_working_day(weekday),
                None => !matches!(weekday, Weekday::Sat | Weekday::Sun),
            },
        }
    }

    /// The exception covering `date`, searching this calendar first and
    /// then each ancestor.
    pub fn find_exception(&self, date: NaiveDate) -> Option<&'a CalendarException> {
        match self.calendar.find_own_exception(date) {
            Some(exception) => Some(exception),
            None => self.parent()?.find_exception(date),
        }
    }

    pub fn find_work_week(&self, date: NaiveDate) -> Option<&'a WorkWeek> {
        match self.calendar.find_own_work_week(date) {
            Some(work_week) => Some(work_week),
            None => self.parent()?.find_work_week(date),
        }
    }

    /// Working hours for `date`, ordered by start time.
    ///
    /// Resolution order: a covering exception, then a covering work week,
    /// then the weekly pattern. A working exception without hours uses the
    /// date's normal hours, or the project default hours if those are empty.
    pub fn effective_hours(&self, date: NaiveDate) -> &'a [TimeRange] {
        if let Some(exception) = self.find_exception(date) {
            if !exception.working {
                return &[];
            }
            if !exception.hours.is_empty() {
                return &exception.hours;
            }
            let normal = self.regular_hours(date);
            return if normal.is_empty() {
                &self.defaults().default_hours
            } else {
                normal
            };
        }
        self.regular_hours(date)
    }

    fn regular_hours(&self, date: NaiveDate) -> &'a [TimeRange] {
        let weekday = date.weekday();
        match self.find_work_week(date) {
            Some(work_week) => match work_week.definition.day_type(weekday) {
                DayType::Working => work_week.definition.hours(weekday),
                DayType::NonWorking => &[],
                DayType::Default => self.week_hours(weekday),
            },
            None => self.week_hours(weekday),
        }
    }

    /// Hours from the weekly pattern alone, ignoring exceptions and work weeks.
    pub fn week_hours(&self, weekday: Weekday) -> &'a [TimeRange] {
        let week = self.calendar.week();
        match week.day_type(weekday) {
            DayType::Working => week.hours(weekday),
            DayType::NonWorking => &[],
            DayType::Default => match self.parent() {
                Some(parent) => parent.week_hours(weekday),
                None if self.is_working_day(weekday) => &self.defaults().default_hours,
                None => &[],
            },
        }
    }

    /// True when some weekday of the weekly pattern has working hours.
    pub fn has_working_weekday(&self) -> bool {
        WEEKDAYS.iter().any(|&weekday| !self.week_hours(weekday).is_empty())
    }

    pub fn is_working_date(&self, date: NaiveDate) -> bool {
        !self.effective_hours(date).is_empty()
    }

    /// Start of the first working range on `date`, or the project default
    /// start time on a non-working date.
    pub fn start_time(&self, date: NaiveDate) -> NaiveTime {
        if let Some(&ms) = self.calendar.cache().start_times.get(&date) {
            return time_from_ms(ms);
        }
        let ms = match self.effective_hours(date).first() {
            Some(range) => range.start_ms(),
            None => hours::ms_of_day(self.defaults().default_start_time),
        };
        self.calendar.cache().start_times.insert(date, ms);
        time_from_ms(ms)
    }

    /// End of the last working range on `date`, or the project default end
    /// time on a non-working date.
    pub fn finish_time(&self, date: NaiveDate) -> NaiveTime {
        match self.effective_hours(date).last() {
            Some(range) => range.end,
            None => self.defaults().default_end_time,
        }
    }

    /// Number of working dates in `start..=end`.
    pub fn get_duration_in_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_working_date(*date))
            .count() as i64
    }
}

fn time_from_ms(ms: i64) -> NaiveTime {
    NaiveTime::MIN + Duration::milliseconds(ms)
}

impl UnitSettings for EffectiveCalendar<'_> {
    fn minutes_per_day(&self) -> u32 {
        self.calendar
            .minutes_per_day_override()
            .or_else(|| self.parent().map(|p| p.minutes_per_day()))
            .unwrap_or(self.defaults().minutes_per_day)
    }

    fn minutes_per_week(&self) -> u32 {
        self.calendar
            .minutes_per_week_override()
            .or_else(|| self.parent().map(|p| p.minutes_per_week()))
            .unwrap_or(self.defaults().minutes_per_week)
    }

    fn minutes_per_month(&self) -> u32 {
        self.calendar
            .minutes_per_month_override()
            .or_else(|| self.parent().map(|p| p.minutes_per_month()))
            .unwrap_or_else(|| self.defaults().minutes_per_month())
    }

    fn minutes_per_year(&self) -> u32 {
        self.calendar
            .minutes_per_year_override()
            .or_else(|| self.parent().map(|p| p.minutes_per_year()))
            .unwrap_or_else(|| self.defaults().minutes_per_year())
    }
}
