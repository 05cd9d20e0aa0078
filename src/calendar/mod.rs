//! Working-time calendars.
//!
//! A `WorkCalendar` owns its weekly pattern, exceptions and work weeks. All
//! queries that may consult a parent calendar go through an
//! `EffectiveCalendar`, obtained from the `CalendarRegistry` that owns the
//! calendar and its ancestors.

mod arithmetic;
mod cache;
mod effective;
mod exception;
mod hours;
mod recurrence;
mod registry;
mod week;

pub use arithmetic::MAX_NONWORKING_DAYS;
pub use effective::EffectiveCalendar;
pub use exception::CalendarException;
pub use hours::{DAY_MS, MS_PER_MINUTE, TimeRange};
pub use recurrence::{MAX_OCCURRENCES, Ordinal, RecurrenceEnd, RecurrencePattern, RecurringData};
pub use registry::CalendarRegistry;
pub use week::{DayType, WeekDefinition, WorkWeek};

use cache::CalendarCache;
use chrono::{NaiveDate, Weekday};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CalendarId = i32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("calendar {0} not found")]
    UnknownCalendar(CalendarId),

    #[error("calendar {calendar} cannot derive from calendar {parent}")]
    InvalidParent { calendar: CalendarId, parent: CalendarId },

    #[error("calendar {0} still has derived calendars")]
    CalendarInUse(CalendarId),

    #[error("unsupported duration unit: {0}")]
    UnsupportedUnit(String),
}

/// A named working-time calendar.
///
/// Every mutator funnels through `mark_dirty`, which re-sorts exceptions
/// and work weeks, re-expands recurring exceptions and drops cached values.
/// Derived state is not serialized; it is rebuilt when the calendar is
/// registered.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkCalendar {
    id: CalendarId,
    name: String,
    parent: Option<CalendarId>,
    #[serde(default)]
    week: WeekDefinition,
    #[serde(default)]
    exceptions: Vec<CalendarException>,
    #[serde(default)]
    work_weeks: Vec<WorkWeek>,
    #[serde(default)]
    minutes_per_day: Option<u32>,
    #[serde(default)]
    minutes_per_week: Option<u32>,
    #[serde(default)]
    minutes_per_month: Option<u32>,
    #[serde(default)]
    minutes_per_year: Option<u32>,
    #[serde(skip)]
    expanded: Vec<CalendarException>,
    #[serde(skip)]
    cache: Mutex<CalendarCache>,
}

impl Clone for WorkCalendar {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            parent: self.parent,
            week: self.week.clone(),
            exceptions: self.exceptions.clone(),
            work_weeks: self.work_weeks.clone(),
            minutes_per_day: self.minutes_per_day,
            minutes_per_week: self.minutes_per_week,
            minutes_per_month: self.minutes_per_month,
            minutes_per_year: self.minutes_per_year,
            expanded: self.expanded.clone(),
            cache: Mutex::new(CalendarCache::default()),
        }
    }
}

impl WorkCalendar {
    /// A calendar whose days are all `Default`.
    pub fn new(id: CalendarId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            week: WeekDefinition::default(),
            exceptions: Vec::new(),
            work_weeks: Vec::new(),
            minutes_per_day: None,
            minutes_per_week: None,
            minutes_per_month: None,
            minutes_per_year: None,
            expanded: Vec::new(),
            cache: Mutex::new(CalendarCache::default()),
        }
    }

    /// Mon-Fri 08:00-12:00 and 13:00-17:00, weekends off.
    pub fn standard(id: CalendarId) -> Self {
        let mut calendar = Self::new(id, "Standard");
        calendar.week = WeekDefinition::working_weekdays(&[
            TimeRange::from_hm(8, 0, 12, 0),
            TimeRange::from_hm(13, 0, 17, 0),
        ]);
        calendar
    }

    /// A calendar that inherits every day from `parent`. The link is
    /// validated when the calendar is inserted into a registry.
    pub fn derived(id: CalendarId, name: impl Into<String>, parent: CalendarId) -> Self {
        let mut calendar = Self::new(id, name);
        calendar.parent = Some(parent);
        calendar
    }

    pub fn id(&self) -> CalendarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<CalendarId> {
        self.parent
    }

    pub fn week(&self) -> &WeekDefinition {
        &self.week
    }

    pub fn exceptions(&self) -> &[CalendarException] {
        &self.exceptions
    }

    /// Exceptions with recurrences flattened, sorted by start date.
    pub fn expanded_exceptions(&self) -> &[CalendarException] {
        &self.expanded
    }

    pub fn work_weeks(&self) -> &[WorkWeek] {
        &self.work_weeks
    }

    pub fn minutes_per_day_override(&self) -> Option<u32> {
        self.minutes_per_day
    }

    pub fn minutes_per_week_override(&self) -> Option<u32> {
        self.minutes_per_week
    }

    pub fn minutes_per_month_override(&self) -> Option<u32> {
        self.minutes_per_month
    }

    pub fn minutes_per_year_override(&self) -> Option<u32> {
        self.minutes_per_year
    }

    /// True while any derived value is memoized.
    pub fn has_cached_values(&self) -> bool {
        !self.cache.lock().is_empty()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_day_type(&mut self, weekday: Weekday, day_type: DayType) {
        self.week.set_day_type(weekday, day_type);
        self.mark_dirty();
    }

    pub fn set_hours(&mut self, weekday: Weekday, hours: Vec<TimeRange>) {
        self.week.set_hours(weekday, hours);
        self.mark_dirty();
    }

    pub fn set_day(&mut self, weekday: Weekday, day_type: DayType, hours: Vec<TimeRange>) {
        self.week.set_day(weekday, day_type, hours);
        self.mark_dirty();
    }

    pub fn set_week(&mut self, week: WeekDefinition) {
        self.week = week;
        self.mark_dirty();
    }

    pub fn add_exception(&mut self, exception: CalendarException) {
        self.exceptions.push(exception);
        self.mark_dirty();
    }

    /// Removes the first exception starting on `from`.
    pub fn remove_exception(&mut self, from: NaiveDate) -> Option<CalendarException> {
        let position = self.exceptions.iter().position(|e| e.from == from)?;
        let removed = self.exceptions.remove(position);
        self.mark_dirty();
        Some(removed)
    }

    pub fn clear_exceptions(&mut self) {
        self.exceptions.clear();
        self.mark_dirty();
    }

    pub fn add_work_week(&mut self, work_week: WorkWeek) {
        self.work_weeks.push(work_week);
        self.mark_dirty();
    }

    pub fn remove_work_week(&mut self, from: NaiveDate) -> Option<WorkWeek> {
        let position = self.work_weeks.iter().position(|w| w.from == from)?;
        let removed = self.work_weeks.remove(position);
        self.mark_dirty();
        Some(removed)
    }

    pub fn set_minutes_per_day(&mut self, minutes: Option<u32>) {
        self.minutes_per_day = minutes;
        self.mark_dirty();
    }

    pub fn set_minutes_per_week(&mut self, minutes: Option<u32>) {
        self.minutes_per_week = minutes;
        self.mark_dirty();
    }

    pub fn set_minutes_per_month(&mut self, minutes: Option<u32>) {
        self.minutes_per_month = minutes;
        self.mark_dirty();
    }

    pub fn set_minutes_per_year(&mut self, minutes: Option<u32>) {
        self.minutes_per_year = minutes;
        self.mark_dirty();
    }

    pub(crate) fn set_parent_id(&mut self, parent: Option<CalendarId>) {
        self.parent = parent;
        self.mark_dirty();
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.exceptions.sort_by_key(|e| (e.from, e.to));
        self.work_weeks.sort_by_key(|w| (w.from, w.to));
        self.expanded = self
            .exceptions
            .iter()
            .flat_map(CalendarException::expand)
            .collect();
        self.expanded.sort_by_key(|e| (e.from, e.to));
        self.cache.get_mut().clear();
    }

    pub(crate) fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, CalendarCache> {
        self.cache.lock()
    }

    pub(crate) fn find_own_exception(&self, date: NaiveDate) -> Option<&CalendarException> {
        let index = self.expanded.partition_point(|e| e.from <= date);
        let candidate = self.expanded.get(index.checked_sub(1)?)?;
        candidate.contains(date).then_some(candidate)
    }

    pub(crate) fn find_own_work_week(&self, date: NaiveDate) -> Option<&WorkWeek> {
        let index = self.work_weeks.partition_point(|w| w.from <= date);
        let candidate = self.work_weeks.get(index.checked_sub(1)?)?;
        candidate.contains(date).then_some(candidate)
    }
}
