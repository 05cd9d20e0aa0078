pub mod calculations;
pub mod calendar;
pub mod duration;
pub mod error;
pub mod frame;
pub mod graph;
pub mod metadata;
pub mod schedule;
pub mod task;
pub mod task_validation;

pub use calendar::{
    CalendarError, CalendarException, CalendarId, CalendarRegistry, DayType, EffectiveCalendar,
    Ordinal, RecurrenceEnd, RecurrencePattern, RecurringData, TimeRange, WeekDefinition,
    WorkCalendar, WorkWeek,
};
pub use duration::{TimeUnit, UnitSettings, WorkDuration};
pub use error::{Result, ScheduleError};
pub use graph::ScheduleDag;
pub use metadata::{STANDARD_CALENDAR_ID, ScheduleMetadata, ScheduleMetadataError, TimeDefaults};
pub use schedule::{RefreshSummary, Schedule};
pub use task::{ConstraintType, Relation, RelationType, Task, TaskId, TaskMode};
pub use task_validation::TaskValidationError;
