use super::{DateMap, task_calendar};
use crate::calendar::{CalendarId, CalendarRegistry, EffectiveCalendar};
use crate::duration::TimeUnit;
use crate::error::{Result, ScheduleError};
use crate::graph::ScheduleDag;
use crate::task::{ConstraintType, Relation, RelationType, Task, TaskId};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Late dates for every schedulable task, walked in reverse topological
/// order. Results map each task to `(late_start, late_finish)`.
pub struct BackwardPass<'a> {
    tasks: &'a HashMap<TaskId, &'a Task>,
    dag: &'a ScheduleDag,
    calendars: &'a CalendarRegistry,
    default_calendar: CalendarId,
}

impl<'a> BackwardPass<'a> {
    pub fn new(
        tasks: &'a HashMap<TaskId, &'a Task>,
        dag: &'a ScheduleDag,
        calendars: &'a CalendarRegistry,
        default_calendar: CalendarId,
    ) -> Self {
        Self {
            tasks,
            dag,
            calendars,
            default_calendar,
        }
    }

    pub fn execute(&self, order: &[TaskId], project_finish: NaiveDateTime) -> Result<DateMap> {
        let mut late_dates = DateMap::with_capacity(order.len());
        debug!(tasks = order.len(), %project_finish, "backward pass");

        for &task_id in order.iter().rev() {
            let task = self
                .tasks
                .get(&task_id)
                .copied()
                .ok_or(ScheduleError::UnknownTask(task_id))?;
            let calendar = task_calendar(self.calendars, task, self.default_calendar)?;

            let late_finish = match (task.actual_finish, task.actual_start) {
                (Some(actual), _) => actual,
                (None, Some(actual_start)) if task.milestone => actual_start,
                _ => self.late_finish(task, &calendar, &late_dates, project_finish)?,
            };
            let late_start = match task.actual_start {
                Some(actual) => actual,
                None => calendar.get_date(late_finish, task.duration.negate(), false)?,
            };

            trace!(task = task_id, %late_start, %late_finish, "late dates");
            late_dates.insert(task_id, (late_start, late_finish));
        }

        Ok(late_dates)
    }

    fn late_finish(
        &self,
        task: &Task,
        calendar: &EffectiveCalendar<'_>,
        late_dates: &DateMap,
        project_finish: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        let successors = self.dag.successors(task.id);
        let mut late_finish = if successors.is_empty() {
            project_finish
        } else {
            let mut earliest: Option<NaiveDateTime> = None;
            for relation in successors {
                let finish = self
                    .relation_finish(task, relation, calendar, late_dates)?
                    .min(project_finish);
                earliest = Some(earliest.map_or(finish, |current| current.min(finish)));
            }
            earliest.ok_or_else(|| {
                ScheduleError::Invariant(format!("missing late start for task {}", task.id))
            })?
        };

        late_finish = apply_constraint(
            calendar,
            task,
            late_finish,
            Some(task.constraint_type),
            task.constraint_date,
        )?;
        late_finish = apply_constraint(
            calendar,
            task,
            late_finish,
            task.secondary_constraint_type,
            task.secondary_constraint_date,
        )?;
        if let Some(deadline) = task.deadline {
            late_finish = late_finish.min(deadline);
        }
        late_finish = late_finish.min(project_finish);

        // A finish at the very start of a working period belongs to the end
        // of the previous one.
        if calendar.next_work_start(late_finish) == late_finish {
            let previous = calendar.previous_work_finish(late_finish);
            if calendar.get_work(previous, late_finish, TimeUnit::Minutes)?.is_zero() {
                late_finish = previous;
            }
        }
        Ok(late_finish)
    }

    /// Latest finish of `task` allowed by a single successor relation.
    fn relation_finish(
        &self,
        task: &Task,
        relation: &Relation,
        calendar: &EffectiveCalendar<'_>,
        late_dates: &DateMap,
    ) -> Result<NaiveDateTime> {
        let &(succ_start, succ_finish) = late_dates.get(&relation.source).ok_or_else(|| {
            ScheduleError::Invariant(format!(
                "successor {} of task {} has no late dates",
                relation.source, task.id
            ))
        })?;
        let back_lag = relation.lag.negate();
        let finish = match relation.relation_type {
            RelationType::FinishStart => calendar.get_date(succ_start, back_lag, false)?,
            RelationType::StartStart => {
                let start = calendar.get_date(succ_start, back_lag, false)?;
                let start = calendar.next_work_start(start);
                calendar.get_date(start, task.duration, false)?
            }
            RelationType::FinishFinish => calendar.get_date(succ_finish, back_lag, false)?,
            RelationType::StartFinish => {
                let finish = calendar.get_date(succ_finish, task.duration, false)?;
                calendar.get_date(finish, back_lag, false)?
            }
        };
        Ok(finish)
    }
}

/// Pulls a late finish back to satisfy one date constraint.
fn apply_constraint(
    calendar: &EffectiveCalendar<'_>,
    task: &Task,
    late_finish: NaiveDateTime,
    constraint_type: Option<ConstraintType>,
    constraint_date: Option<NaiveDateTime>,
) -> Result<NaiveDateTime> {
    let (Some(constraint_type), Some(date)) = (constraint_type, constraint_date) else {
        return Ok(late_finish);
    };
    let adjusted = match constraint_type {
        ConstraintType::MustStartOn => calendar.get_date(date, task.duration, false)?,
        ConstraintType::MustFinishOn => date,
        ConstraintType::StartNoLaterThan => {
            late_finish.min(calendar.get_date(date, task.duration, false)?)
        }
        ConstraintType::FinishNoLaterThan => late_finish.min(date),
        ConstraintType::AsSoonAsPossible
        | ConstraintType::AsLateAsPossible
        | ConstraintType::StartNoEarlierThan
        | ConstraintType::FinishNoEarlierThan => late_finish,
    };
    Ok(adjusted)
}
