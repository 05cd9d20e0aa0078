use crate::calendar::CalendarId;
use crate::duration::WorkDuration;
use crate::error::ScheduleError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    #[default]
    FinishStart,
    StartStart,
    FinishFinish,
    StartFinish,
}

impl RelationType {
    pub fn code(self) -> &'static str {
        match self {
            RelationType::FinishStart => "FS",
            RelationType::StartStart => "SS",
            RelationType::FinishFinish => "FF",
            RelationType::StartFinish => "SF",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RelationType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FS" => Ok(RelationType::FinishStart),
            "SS" => Ok(RelationType::StartStart),
            "FF" => Ok(RelationType::FinishFinish),
            "SF" => Ok(RelationType::StartFinish),
            other => Err(ScheduleError::UnsupportedRelation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    #[default]
    AsSoonAsPossible,
    AsLateAsPossible,
    StartNoEarlierThan,
    StartNoLaterThan,
    FinishNoEarlierThan,
    FinishNoLaterThan,
    MustStartOn,
    MustFinishOn,
}

impl ConstraintType {
    pub fn code(self) -> &'static str {
        match self {
            ConstraintType::AsSoonAsPossible => "ASAP",
            ConstraintType::AsLateAsPossible => "ALAP",
            ConstraintType::StartNoEarlierThan => "SNET",
            ConstraintType::StartNoLaterThan => "SNLT",
            ConstraintType::FinishNoEarlierThan => "FNET",
            ConstraintType::FinishNoLaterThan => "FNLT",
            ConstraintType::MustStartOn => "MSO",
            ConstraintType::MustFinishOn => "MFO",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ConstraintType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let constraint = match s.trim().to_ascii_uppercase().as_str() {
            "ASAP" => ConstraintType::AsSoonAsPossible,
            "ALAP" => ConstraintType::AsLateAsPossible,
            "SNET" => ConstraintType::StartNoEarlierThan,
            "SNLT" => ConstraintType::StartNoLaterThan,
            "FNET" => ConstraintType::FinishNoEarlierThan,
            "FNLT" => ConstraintType::FinishNoLaterThan,
            "MSO" => ConstraintType::MustStartOn,
            "MFO" => ConstraintType::MustFinishOn,
            other => return Err(ScheduleError::UnsupportedConstraint(other.to_string())),
        };
        Ok(constraint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    #[default]
    Auto,
    Manual,
}

/// A precedence link. `source` depends on `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: TaskId,
    pub target: TaskId,
    pub relation_type: RelationType,
    #[serde(default)]
    pub lag: WorkDuration,
}

impl Relation {
    pub fn new(
        source: TaskId,
        target: TaskId,
        relation_type: RelationType,
        lag: WorkDuration,
    ) -> Self {
        Self {
            source,
            target,
            relation_type,
            lag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub duration: WorkDuration,
    /// Falls back to the project default calendar when unset.
    pub calendar_id: Option<CalendarId>,
    pub predecessors: Vec<Relation>,
    pub summary: bool,
    pub active: bool,
    pub milestone: bool,
    pub mode: TaskMode,
    pub constraint_type: ConstraintType,
    pub constraint_date: Option<NaiveDateTime>,
    pub secondary_constraint_type: Option<ConstraintType>,
    pub secondary_constraint_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    /// Start supplied by the user for a manually scheduled task.
    pub start: Option<NaiveDateTime>,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_finish: Option<NaiveDateTime>,
    pub leveling_delay: WorkDuration,
    pub early_start: Option<NaiveDateTime>,
    pub early_finish: Option<NaiveDateTime>,
    pub late_start: Option<NaiveDateTime>,
    pub late_finish: Option<NaiveDateTime>,
    pub total_float: Option<WorkDuration>,
    pub is_critical: Option<bool>,
}

impl Default for Task {
    fn default() -> Self {
        Self::new(0, "", WorkDuration::zero())
    }
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, duration: WorkDuration) -> Self {
        Self {
            id,
            name: name.into(),
            duration,
            calendar_id: None,
            predecessors: Vec::new(),
            summary: false,
            active: true,
            milestone: false,
            mode: TaskMode::Auto,
            constraint_type: ConstraintType::AsSoonAsPossible,
            constraint_date: None,
            secondary_constraint_type: None,
            secondary_constraint_date: None,
            deadline: None,
            start: None,
            actual_start: None,
            actual_finish: None,
            leveling_delay: WorkDuration::zero(),
            early_start: None,
            early_finish: None,
            late_start: None,
            late_finish: None,
            total_float: None,
            is_critical: None,
        }
    }

    /// Summary and inactive tasks are skipped by both passes.
    pub fn is_schedulable(&self) -> bool {
        self.active && !self.summary
    }

    pub fn add_predecessor(
        &mut self,
        target: TaskId,
        relation_type: RelationType,
        lag: WorkDuration,
    ) {
        self.predecessors
            .push(Relation::new(self.id, target, relation_type, lag));
    }

    pub fn with_predecessor(
        mut self,
        target: TaskId,
        relation_type: RelationType,
        lag: WorkDuration,
    ) -> Self {
        self.add_predecessor(target, relation_type, lag);
        self
    }

    pub fn with_constraint(mut self, constraint_type: ConstraintType, date: NaiveDateTime) -> Self {
        self.constraint_type = constraint_type;
        self.constraint_date = Some(date);
        self
    }

    pub fn with_calendar(mut self, calendar_id: CalendarId) -> Self {
        self.calendar_id = Some(calendar_id);
        self
    }

    pub fn clear_schedule(&mut self) {
        self.early_start = None;
        self.early_finish = None;
        self.late_start = None;
        self.late_finish = None;
        self.total_float = None;
        self.is_critical = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relation_and_constraint_codes() {
        assert_eq!("ss".parse::<RelationType>().unwrap(), RelationType::StartStart);
        assert_eq!("MFO".parse::<ConstraintType>().unwrap(), ConstraintType::MustFinishOn);
        assert!(matches!(
            "XX".parse::<RelationType>(),
            Err(ScheduleError::UnsupportedRelation(code)) if code == "XX"
        ));
        assert!(matches!(
            "nope".parse::<ConstraintType>(),
            Err(ScheduleError::UnsupportedConstraint(_))
        ));
    }

    #[test]
    fn predecessor_relations_are_owned_by_the_successor() {
        let task = Task::new(2, "Pour", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::FinishStart,
            WorkDuration::zero(),
        );
        assert_eq!(task.predecessors[0].source, 2);
        assert_eq!(task.predecessors[0].target, 1);
        assert!(task.is_schedulable());
    }
}
