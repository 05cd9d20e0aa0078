use super::hours::TimeRange;
use super::recurrence::RecurringData;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A dated override of a calendar's normal working pattern.
///
/// Without a recurrence rule the exception covers `from..=to`. With one,
/// each occurrence date `d` produces a concrete exception covering
/// `d..=d + (to - from)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarException {
    pub name: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub working: bool,
    /// Explicit hours for a working exception. Empty means the normal hours
    /// for the date still apply.
    #[serde(default)]
    pub hours: Vec<TimeRange>,
    #[serde(default)]
    pub recurrence: Option<RecurringData>,
}

impl CalendarException {
    pub fn non_working(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            name: None,
            from,
            to,
            working: false,
            hours: Vec::new(),
            recurrence: None,
        }
    }

    pub fn working(from: NaiveDate, to: NaiveDate, hours: Vec<TimeRange>) -> Self {
        Self {
            name: None,
            from,
            to,
            working: true,
            hours,
            recurrence: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_recurrence(mut self, recurrence: RecurringData) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Flatten into concrete, non-recurring exceptions.
    pub fn expand(&self) -> Vec<CalendarException> {
        let Some(recurrence) = &self.recurrence else {
            return vec![self.clone()];
        };
        let span = (self.to - self.from).max(Duration::zero());
        recurrence
            .occurrences()
            .into_iter()
            .filter_map(|date| {
                let to = date.checked_add_signed(span)?;
                Some(CalendarException {
                    name: self.name.clone(),
                    from: date,
                    to,
                    working: self.working,
                    hours: self.hours.clone(),
                    recurrence: None,
                })
            })
            .collect()
    }
}
