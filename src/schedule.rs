use crate::calculations::{self, BackwardPass, DateMap, ForwardPass};
use crate::calendar::{CalendarRegistry, EffectiveCalendar, WorkCalendar};
use crate::duration::{TimeUnit, WorkDuration};
use crate::error::{Result, ScheduleError};
use crate::graph::ScheduleDag;
use crate::metadata::ScheduleMetadata;
use crate::task::{Relation, RelationType, Task, TaskId};
use crate::task_validation::validate_task_collection;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSummary {
    pub task_count: usize,
    pub critical_count: usize,
    /// Critical tasks ordered by early start, then id.
    pub critical_path: Vec<TaskId>,
    pub project_finish: NaiveDateTime,
}

impl fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tasks={} critical={} finish={}",
            self.task_count, self.critical_count, self.project_finish
        )?;
        if !self.critical_path.is_empty() {
            let chain = self
                .critical_path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("->");
            write!(f, " crit_path={chain}")?;
        }
        Ok(())
    }
}

/// A project: tasks, the calendars they run on, and the computed CPM
/// dates.
#[derive(Debug, Clone)]
pub struct Schedule {
    tasks: Vec<Task>,
    calendars: CalendarRegistry,
    metadata: ScheduleMetadata,
    order: Vec<TaskId>,
    project_finish: Option<NaiveDateTime>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        let metadata = ScheduleMetadata::default();
        let calendars = CalendarRegistry::with_standard_calendar(
            metadata.time_defaults.clone(),
            metadata.default_calendar_id,
        );
        Self {
            tasks: Vec::new(),
            calendars,
            metadata,
            order: Vec::new(),
            project_finish: None,
        }
    }

    pub fn new_with_metadata(metadata: ScheduleMetadata) -> Result<Self> {
        metadata.validate()?;
        let calendars = CalendarRegistry::with_standard_calendar(
            metadata.time_defaults.clone(),
            metadata.default_calendar_id,
        );
        Ok(Self {
            tasks: Vec::new(),
            calendars,
            metadata,
            order: Vec::new(),
            project_finish: None,
        })
    }

    pub fn metadata(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    /// Replaces the project metadata. New time defaults reach every
    /// calendar; a default calendar id with no calendar gets a Standard one.
    pub fn set_metadata(&mut self, metadata: ScheduleMetadata) -> Result<()> {
        metadata.validate()?;
        self.calendars.set_defaults(metadata.time_defaults.clone());
        if !self.calendars.contains(metadata.default_calendar_id) {
            self.calendars
                .insert(WorkCalendar::standard(metadata.default_calendar_id))?;
        }
        self.metadata = metadata;
        Ok(())
    }

    pub fn set_project_start(&mut self, start: NaiveDateTime) {
        self.metadata.project_start = start;
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Inserts a task or replaces the task with the same id.
    pub fn upsert_task(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    /// Removes a task and every relation pointing at it.
    pub fn delete_task(&mut self, task_id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        if self.tasks.len() == before {
            return false;
        }
        for task in &mut self.tasks {
            task.predecessors.retain(|r| r.target != task_id);
        }
        true
    }

    /// Makes `successor` depend on `predecessor`.
    pub fn add_relation(
        &mut self,
        successor: TaskId,
        predecessor: TaskId,
        relation_type: RelationType,
        lag: WorkDuration,
    ) -> Result<()> {
        if self.task(predecessor).is_none() {
            return Err(ScheduleError::UnknownTask(predecessor));
        }
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == successor)
            .ok_or(ScheduleError::UnknownTask(successor))?;
        task.predecessors
            .push(Relation::new(successor, predecessor, relation_type, lag));
        Ok(())
    }

    pub fn calendars(&self) -> &CalendarRegistry {
        &self.calendars
    }

    pub fn calendars_mut(&mut self) -> &mut CalendarRegistry {
        &mut self.calendars
    }

    pub fn add_calendar(&mut self, calendar: WorkCalendar) -> Result<()> {
        self.calendars.insert(calendar)?;
        Ok(())
    }

    /// The calendar a task is scheduled against.
    pub fn effective_calendar(&self, task: &Task) -> Result<EffectiveCalendar<'_>> {
        calculations::task_calendar(&self.calendars, task, self.metadata.default_calendar_id)
    }

    pub fn project_finish(&self) -> Option<NaiveDateTime> {
        self.project_finish
    }

    /// Schedulable task ids in the order of the last forward pass.
    pub fn scheduled_order(&self) -> &[TaskId] {
        &self.order
    }

    fn sorted_dag(&self) -> Result<(ScheduleDag, Vec<TaskId>)> {
        validate_task_collection(&self.tasks, &self.calendars)?;
        let dag = ScheduleDag::build(&self.tasks);
        let order = dag.topological_order()?;
        Ok((dag, order))
    }

    fn write_dates(
        &mut self,
        dates: &DateMap,
        apply: impl Fn(&mut Task, NaiveDateTime, NaiveDateTime),
    ) {
        for task in &mut self.tasks {
            if let Some(&(start, finish)) = dates.get(&task.id) {
                apply(task, start, finish);
            }
        }
    }

    /// Computes early dates from the project start and returns the project
    /// finish.
    pub fn forward_pass(&mut self) -> Result<NaiveDateTime> {
        let (dag, order) = self.sorted_dag()?;
        let early_dates = {
            let by_id: HashMap<TaskId, &Task> = self.tasks.iter().map(|t| (t.id, t)).collect();
            ForwardPass::new(&by_id, &dag, &self.calendars, self.metadata.default_calendar_id)
                .execute(&order, self.metadata.project_start)?
        };
        let project_finish = calculations::project_finish(&early_dates)?;

        for task in &mut self.tasks {
            task.clear_schedule();
        }
        self.write_dates(&early_dates, |task, start, finish| {
            task.early_start = Some(start);
            task.early_finish = Some(finish);
        });
        self.order = order;
        self.project_finish = Some(project_finish);
        debug!(%project_finish, "forward pass complete");
        Ok(project_finish)
    }

    /// Computes late dates back from the project finish of the last
    /// forward pass.
    pub fn backward_pass(&mut self) -> Result<()> {
        let project_finish = self.project_finish.ok_or_else(|| {
            ScheduleError::Invariant("backward pass requires a completed forward pass".to_string())
        })?;
        let (dag, order) = self.sorted_dag()?;
        let late_dates = {
            let by_id: HashMap<TaskId, &Task> = self.tasks.iter().map(|t| (t.id, t)).collect();
            BackwardPass::new(&by_id, &dag, &self.calendars, self.metadata.default_calendar_id)
                .execute(&order, project_finish)?
        };
        self.write_dates(&late_dates, |task, start, finish| {
            task.late_start = Some(start);
            task.late_finish = Some(finish);
        });
        Ok(())
    }

    /// Runs both passes, then total float and criticality.
    pub fn refresh(&mut self) -> Result<RefreshSummary> {
        let project_finish = self.forward_pass()?;
        self.backward_pass()?;

        let mut floats: HashMap<TaskId, WorkDuration> = HashMap::with_capacity(self.order.len());
        for task in self.tasks.iter().filter(|t| t.is_schedulable()) {
            if let (Some(early_start), Some(late_start)) = (task.early_start, task.late_start) {
                let calendar = self.effective_calendar(task)?;
                floats.insert(task.id, calendar.get_work(early_start, late_start, TimeUnit::Days)?);
            }
        }

        let mut critical: Vec<(NaiveDateTime, TaskId)> = Vec::new();
        for task in &mut self.tasks {
            if let Some(&float) = floats.get(&task.id) {
                let is_critical = float.value <= 0.0;
                task.total_float = Some(float);
                task.is_critical = Some(is_critical);
                if let (true, Some(early_start)) = (is_critical, task.early_start) {
                    critical.push((early_start, task.id));
                }
            }
        }
        critical.sort();

        let summary = RefreshSummary {
            task_count: self.order.len(),
            critical_count: critical.len(),
            critical_path: critical.into_iter().map(|(_, id)| id).collect(),
            project_finish,
        };
        info!(%summary, "schedule refreshed");
        Ok(summary)
    }
}
