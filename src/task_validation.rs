use crate::calendar::CalendarRegistry;
use crate::task::{Task, TaskId};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TaskValidationError {
    task_id: Option<TaskId>,
    message: String,
}

impl TaskValidationError {
    pub fn new(task_id: Option<TaskId>, message: impl Into<String>) -> Self {
        Self {
            task_id,
            message: message.into(),
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn validate_task(task: &Task, calendars: &CalendarRegistry) -> Result<(), TaskValidationError> {
    if !task.duration.value.is_finite() || task.duration.is_negative() {
        return Err(TaskValidationError::new(
            Some(task.id),
            format!("task {} has negative duration {}", task.id, task.duration),
        ));
    }

    if task.leveling_delay.is_negative() {
        return Err(TaskValidationError::new(
            Some(task.id),
            format!("task {} has negative leveling delay {}", task.id, task.leveling_delay),
        ));
    }

    if let Some(calendar_id) = task.calendar_id {
        if !calendars.contains(calendar_id) {
            return Err(TaskValidationError::new(
                Some(task.id),
                format!("task {} references unknown calendar {}", task.id, calendar_id),
            ));
        }
    }

    for relation in &task.predecessors {
        if relation.source != task.id {
            return Err(TaskValidationError::new(
                Some(task.id),
                format!(
                    "task {} holds a relation whose source is task {}",
                    task.id, relation.source
                ),
            ));
        }
        if relation.target == task.id {
            return Err(TaskValidationError::new(
                Some(task.id),
                format!("task {} depends on itself", task.id),
            ));
        }
    }

    Ok(())
}

/// Checks every task, then that each relation points at a known task.
pub fn validate_task_collection(
    tasks: &[Task],
    calendars: &CalendarRegistry,
) -> Result<(), TaskValidationError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(TaskValidationError::new(
                Some(task.id),
                format!("duplicate task id {}", task.id),
            ));
        }
        validate_task(task, calendars)?;
    }

    for task in tasks {
        for relation in &task.predecessors {
            if !seen_ids.contains(&relation.target) {
                return Err(TaskValidationError::new(
                    Some(task.id),
                    format!(
                        "task {} depends on unknown task {}",
                        task.id, relation.target
                    ),
                ));
            }
        }
    }
    Ok(())
}
