pub mod backward_pass;
pub mod forward_pass;

pub use backward_pass::BackwardPass;
pub use forward_pass::ForwardPass;

use crate::calendar::{CalendarId, CalendarRegistry, EffectiveCalendar};
use crate::error::{Result, ScheduleError};
use crate::task::{Task, TaskId};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// (start, finish) per task.
pub type DateMap = HashMap<TaskId, (NaiveDateTime, NaiveDateTime)>;

/// The task's own calendar, or the project default.
pub fn task_calendar<'a>(
    calendars: &'a CalendarRegistry,
    task: &Task,
    default_calendar: CalendarId,
) -> Result<EffectiveCalendar<'a>> {
    Ok(calendars.calendar(task.calendar_id.unwrap_or(default_calendar))?)
}

/// Latest early finish across the forward pass results.
pub fn project_finish(early_dates: &DateMap) -> Result<NaiveDateTime> {
    early_dates
        .values()
        .map(|&(_, finish)| finish)
        .max()
        .ok_or_else(|| ScheduleError::Invariant("missing early finish date".to_string()))
}
