//! Error types for schedule computation.

use crate::calendar::CalendarError;
use crate::metadata::ScheduleMetadataError;
use crate::task::TaskId;
use crate::task_validation::TaskValidationError;
use thiserror::Error;

/// Main error type for scheduling operations.
///
/// Every variant aborts the scheduling run for the whole task set; a
/// partially scheduled project is never returned.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The precedence graph over active, non-summary tasks contains a cycle.
    #[error("cycle detected in task dependencies")]
    Cycle,

    /// A value required by the forward or backward pass could not be produced.
    #[error("scheduling invariant violated: {0}")]
    Invariant(String),

    #[error("unsupported relation type: {0}")]
    UnsupportedRelation(String),

    #[error("unsupported constraint type: {0}")]
    UnsupportedConstraint(String),

    #[error("task {0} not found")]
    UnknownTask(TaskId),

    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("invalid task data: {0}")]
    Validation(#[from] TaskValidationError),

    #[error("invalid schedule metadata: {0}")]
    Metadata(#[from] ScheduleMetadataError),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
