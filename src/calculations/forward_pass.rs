use super::{DateMap, task_calendar};
use crate::calendar::{CalendarId, CalendarRegistry, EffectiveCalendar};
use crate::error::{Result, ScheduleError};
use crate::graph::ScheduleDag;
use crate::task::{ConstraintType, Relation, RelationType, Task, TaskId, TaskMode};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Early dates for every schedulable task, walked in topological order.
pub struct ForwardPass<'a> {
    tasks: &'a HashMap<TaskId, &'a Task>,
    dag: &'a ScheduleDag,
    calendars: &'a CalendarRegistry,
    default_calendar: CalendarId,
}

impl<'a> ForwardPass<'a> {
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

    pub fn execute(&self, order: &[TaskId], project_start: NaiveDateTime) -> Result<DateMap> {
        let mut early_dates = DateMap::with_capacity(order.len());
        debug!(tasks = order.len(), %project_start, "forward pass");

        for &task_id in order {
            let task = self.task(task_id)?;
            let calendar = task_calendar(self.calendars, task, self.default_calendar)?;

            let early_start = self.early_start(task, &calendar, &early_dates, project_start)?;
            let early_finish = match task.actual_finish {
                Some(actual) => actual,
                None => self.early_finish(task, &calendar, early_start)?,
            };

            trace!(task = task_id, %early_start, %early_finish, "early dates");
            early_dates.insert(task_id, (early_start, early_finish));
        }

        Ok(early_dates)
    }

    fn task(&self, task_id: TaskId) -> Result<&'a Task> {
        self.tasks
            .get(&task_id)
            .copied()
            .ok_or(ScheduleError::UnknownTask(task_id))
    }

    fn early_start(
        &self,
        task: &Task,
        calendar: &EffectiveCalendar<'_>,
        early_dates: &DateMap,
        project_start: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        let mut early_start = match (task.actual_start, task.mode, task.start) {
            (Some(actual), _, _) => actual,
            (None, TaskMode::Manual, Some(start)) => start,
            (None, mode, _) => {
                if mode == TaskMode::Manual {
                    warn!(task = task.id, "manual task has no start; scheduling automatically");
                }
                let candidate = self.candidate_start(task, calendar, early_dates, project_start)?;
                calendar.next_work_start(candidate)
            }
        };
        early_start = apply_constraint(
            calendar,
            task,
            early_start,
            Some(task.constraint_type),
            task.constraint_date,
        )?;
        early_start = apply_constraint(
            calendar,
            task,
            early_start,
            task.secondary_constraint_type,
            task.secondary_constraint_date,
        )?;
        if let Some(actual) = task.actual_start.filter(|&actual| actual != early_start) {
            warn!(task = task.id, %actual, %early_start, "constraint moved an actual start");
        }
        Ok(early_start)
    }

    /// Latest start allowed by the active predecessors, or the project
    /// start (or a start/finish-no-earlier-than date) when there are none.
    fn candidate_start(
        &self,
        task: &Task,
        calendar: &EffectiveCalendar<'_>,
        early_dates: &DateMap,
        project_start: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        let predecessors = self.dag.predecessors(task.id);
        let candidate = if predecessors.is_empty() {
            match (task.constraint_type, task.constraint_date) {
                (ConstraintType::StartNoEarlierThan, Some(date)) => date,
                (ConstraintType::FinishNoEarlierThan, Some(date)) => {
                    calendar.get_date(date, task.duration.negate(), false)?
                }
                _ => project_start,
            }
        } else {
            let mut latest: Option<NaiveDateTime> = None;
            for relation in predecessors {
                let start = self.relation_start(task, relation, calendar, early_dates)?;
                latest = latest.max(Some(start));
            }
            latest.ok_or_else(|| {
                ScheduleError::Invariant(format!("missing early start for task {}", task.id))
            })?
        };
        Ok(candidate)
    }

    /// Earliest start of `task` allowed by a single predecessor relation.
    fn relation_start(
        &self,
        task: &Task,
        relation: &Relation,
        calendar: &EffectiveCalendar<'_>,
        early_dates: &DateMap,
    ) -> Result<NaiveDateTime> {
        let &(pred_start, pred_finish) = early_dates.get(&relation.target).ok_or_else(|| {
            ScheduleError::Invariant(format!(
                "predecessor {} of task {} has no early dates",
                relation.target, task.id
            ))
        })?;
        let own = task.duration.negate();
        let start = match relation.relation_type {
            RelationType::FinishStart => calendar.get_date(pred_finish, relation.lag, false)?,
            RelationType::StartStart => calendar.get_date(pred_start, relation.lag, false)?,
            RelationType::FinishFinish => {
                let start = calendar.get_date(pred_finish, own, false)?;
                calendar.get_date(start, relation.lag, false)?
            }
            RelationType::StartFinish => {
                let start = calendar.get_date(pred_start, own, false)?;
                calendar.get_date(start, relation.lag, false)?
            }
        };
        Ok(start)
    }

    fn early_finish(
        &self,
        task: &Task,
        calendar: &EffectiveCalendar<'_>,
        early_start: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        let pinned = [
            (Some(task.constraint_type), task.constraint_date),
            (task.secondary_constraint_type, task.secondary_constraint_date),
        ]
        .into_iter()
        .find_map(|constraint| match constraint {
            (Some(ConstraintType::MustFinishOn), Some(date)) => Some(date),
            _ => None,
        });
        if let Some(date) = pinned {
            return Ok(date);
        }

        let delayed = if task.leveling_delay.is_zero() {
            early_start
        } else {
            calendar.get_date(early_start, task.leveling_delay, false)?
        };
        Ok(calendar.get_date(delayed, task.duration, false)?)
    }
}

/// Moves a computed early start to satisfy one date constraint.
fn apply_constraint(
    calendar: &EffectiveCalendar<'_>,
    task: &Task,
    early_start: NaiveDateTime,
    constraint_type: Option<ConstraintType>,
    constraint_date: Option<NaiveDateTime>,
) -> Result<NaiveDateTime> {
    let (Some(constraint_type), Some(date)) = (constraint_type, constraint_date) else {
        return Ok(early_start);
    };
    let start_for_finish =
        |finish: NaiveDateTime| calendar.get_date(finish, task.duration.negate(), false);

    let adjusted = match constraint_type {
        ConstraintType::AsSoonAsPossible | ConstraintType::AsLateAsPossible => early_start,
        ConstraintType::StartNoEarlierThan => early_start.max(date),
        ConstraintType::StartNoLaterThan => early_start.min(date),
        ConstraintType::FinishNoEarlierThan => {
            let finish = calendar.get_date(early_start, task.duration, false)?;
            if finish < date {
                start_for_finish(date)?
            } else {
                early_start
            }
        }
        ConstraintType::FinishNoLaterThan => {
            let finish = calendar.get_date(early_start, task.duration, false)?;
            if finish > date {
                start_for_finish(date)?
            } else {
                early_start
            }
        }
        ConstraintType::MustStartOn => date,
        ConstraintType::MustFinishOn => start_for_finish(date)?,
    };
    if adjusted != early_start {
        trace!(
            task = task.id,
            constraint = %constraint_type,
            %early_start,
            %adjusted,
            "constraint applied"
        );
    }
    Ok(adjusted)
}
