use chrono::{NaiveDate, NaiveDateTime};
use schedule_cpm::{
    ConstraintType, RelationType, Schedule, Task, TaskId, TaskMode, WorkDuration,
};

fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

fn early(schedule: &Schedule, id: TaskId) -> (NaiveDateTime, NaiveDateTime) {
    let task = schedule.task(id).unwrap();
    (task.early_start.unwrap(), task.early_finish.unwrap())
}

/// Schedule starting Monday 2025-01-06 08:00 on the Standard calendar.
fn schedule_with(tasks: Vec<Task>) -> Schedule {
    let mut schedule = Schedule::new();
    schedule.set_project_start(dt(2025, 1, 6, 8, 0));
    for task in tasks {
        schedule.upsert_task(task);
    }
    schedule
}

#[test]
fn isolated_task_starts_at_the_next_working_instant() {
    let mut schedule = schedule_with(vec![Task::new(1, "Solo", WorkDuration::days(1.0))]);
    schedule.set_project_start(dt(2025, 1, 4, 10, 0));
    let finish = schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 1), (dt(2025, 1, 6, 8, 0), dt(2025, 1, 6, 17, 0)));
    assert_eq!(finish, dt(2025, 1, 6, 17, 0));
}

#[test]
fn finish_start_chain_moves_to_the_next_working_day() {
    let mut schedule = schedule_with(vec![
        Task::new(1, "A", WorkDuration::days(1.0)),
        Task::new(2, "B", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::FinishStart,
            WorkDuration::zero(),
        ),
    ]);
    let finish = schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 1), (dt(2025, 1, 6, 8, 0), dt(2025, 1, 6, 17, 0)));
    assert_eq!(early(&schedule, 2), (dt(2025, 1, 7, 8, 0), dt(2025, 1, 7, 17, 0)));
    assert_eq!(finish, dt(2025, 1, 7, 17, 0));
    assert_eq!(schedule.scheduled_order(), &[1, 2]);
}

#[test]
fn successor_waits_for_its_latest_predecessor() {
    let fs = WorkDuration::zero();
    let mut schedule = schedule_with(vec![
        Task::new(4, "Handover", WorkDuration::days(2.0))
            .with_predecessor(2, RelationType::FinishStart, fs)
            .with_predecessor(3, RelationType::FinishStart, fs),
        Task::new(3, "Short", WorkDuration::days(1.0))
            .with_predecessor(1, RelationType::FinishStart, fs),
        Task::new(2, "Long", WorkDuration::days(3.0))
            .with_predecessor(1, RelationType::FinishStart, fs),
        Task::new(1, "Kickoff", WorkDuration::days(2.0)),
    ]);
    schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 1), (dt(2025, 1, 6, 8, 0), dt(2025, 1, 7, 17, 0)));
    assert_eq!(early(&schedule, 2), (dt(2025, 1, 8, 8, 0), dt(2025, 1, 10, 17, 0)));
    assert_eq!(early(&schedule, 3), (dt(2025, 1, 8, 8, 0), dt(2025, 1, 8, 17, 0)));
    assert_eq!(early(&schedule, 4), (dt(2025, 1, 13, 8, 0), dt(2025, 1, 14, 17, 0)));
    assert_eq!(schedule.project_finish(), Some(dt(2025, 1, 14, 17, 0)));
}

#[test]
fn relation_types_and_lags() {
    let mut schedule = schedule_with(vec![
        Task::new(1, "A", WorkDuration::days(2.0)),
        Task::new(2, "SS +1d", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::StartStart,
            WorkDuration::days(1.0),
        ),
        Task::new(3, "FF", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::FinishFinish,
            WorkDuration::zero(),
        ),
        Task::new(4, "SF", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::StartFinish,
            WorkDuration::zero(),
        ),
        Task::new(5, "FS -4h", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::FinishStart,
            WorkDuration::hours(-4.0),
        ),
        Task::new(6, "FS +1ed", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::FinishStart,
            WorkDuration::elapsed_days(1.0),
        ),
    ]);
    schedule.forward_pass().unwrap();

    assert_eq!(early(&schedule, 2), (dt(2025, 1, 7, 8, 0), dt(2025, 1, 7, 17, 0)));
    assert_eq!(early(&schedule, 3), (dt(2025, 1, 7, 8, 0), dt(2025, 1, 7, 17, 0)));
    // Start-finish may finish before the project starts.
    assert_eq!(early(&schedule, 4), (dt(2025, 1, 3, 8, 0), dt(2025, 1, 3, 17, 0)));
    assert_eq!(early(&schedule, 5), (dt(2025, 1, 7, 13, 0), dt(2025, 1, 8, 12, 0)));
    // Elapsed lag lands on Wednesday 17:00, which is the end of the day.
    assert_eq!(early(&schedule, 6), (dt(2025, 1, 9, 8, 0), dt(2025, 1, 9, 17, 0)));
}

#[test]
fn must_finish_on_pins_the_finish() {
    let mut schedule = schedule_with(vec![
        Task::new(1, "A", WorkDuration::days(1.0)),
        Task::new(2, "B", WorkDuration::days(3.0))
            .with_predecessor(1, RelationType::FinishStart, WorkDuration::zero())
            .with_constraint(ConstraintType::MustFinishOn, dt(2025, 1, 7, 17, 0)),
    ]);
    schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 2), (dt(2025, 1, 3, 8, 0), dt(2025, 1, 7, 17, 0)));
}

#[test]
fn start_no_earlier_than() {
    let mut schedule = schedule_with(vec![
        Task::new(1, "Free", WorkDuration::days(1.0))
            .with_constraint(ConstraintType::StartNoEarlierThan, dt(2025, 1, 8, 10, 0)),
        Task::new(2, "A", WorkDuration::days(1.0)),
        Task::new(3, "After A", WorkDuration::days(1.0))
            .with_predecessor(2, RelationType::FinishStart, WorkDuration::zero())
            .with_constraint(ConstraintType::StartNoEarlierThan, dt(2025, 1, 9, 8, 0)),
        Task::new(4, "Already late", WorkDuration::days(1.0))
            .with_predecessor(2, RelationType::FinishStart, WorkDuration::zero())
            .with_constraint(ConstraintType::StartNoEarlierThan, dt(2025, 1, 6, 8, 0)),
    ]);
    schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 1), (dt(2025, 1, 8, 10, 0), dt(2025, 1, 9, 10, 0)));
    assert_eq!(early(&schedule, 3).0, dt(2025, 1, 9, 8, 0));
    assert_eq!(early(&schedule, 4).0, dt(2025, 1, 7, 8, 0));
}

#[test]
fn start_no_later_than_and_must_start_on() {
    let mut schedule = schedule_with(vec![
        Task::new(1, "A", WorkDuration::days(2.0)),
        Task::new(2, "Capped", WorkDuration::days(1.0))
            .with_predecessor(1, RelationType::FinishStart, WorkDuration::zero())
            .with_constraint(ConstraintType::StartNoLaterThan, dt(2025, 1, 7, 8, 0)),
        Task::new(3, "Fixed", WorkDuration::days(1.0))
            .with_constraint(ConstraintType::MustStartOn, dt(2025, 1, 9, 8, 0)),
    ]);
    schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 2), (dt(2025, 1, 7, 8, 0), dt(2025, 1, 7, 17, 0)));
    assert_eq!(early(&schedule, 3), (dt(2025, 1, 9, 8, 0), dt(2025, 1, 9, 17, 0)));
}

#[test]
fn actual_and_manual_dates_are_respected() {
    let mut started = Task::new(1, "Started", WorkDuration::days(1.0));
    started.actual_start = Some(dt(2025, 1, 7, 10, 0));
    let mut done = Task::new(2, "Done", WorkDuration::days(1.0));
    done.actual_start = Some(dt(2025, 1, 6, 9, 0));
    done.actual_finish = Some(dt(2025, 1, 6, 15, 0));
    let mut manual = Task::new(3, "Manual", WorkDuration::days(1.0));
    manual.mode = TaskMode::Manual;
    manual.start = Some(dt(2025, 1, 11, 9, 0));
    let mut unplanned = Task::new(4, "Manual without start", WorkDuration::days(1.0));
    unplanned.mode = TaskMode::Manual;

    let mut schedule = schedule_with(vec![started, done, manual, unplanned]);
    schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 1), (dt(2025, 1, 7, 10, 0), dt(2025, 1, 8, 10, 0)));
    assert_eq!(early(&schedule, 2), (dt(2025, 1, 6, 9, 0), dt(2025, 1, 6, 15, 0)));
    assert_eq!(early(&schedule, 3), (dt(2025, 1, 11, 9, 0), dt(2025, 1, 13, 17, 0)));
    assert_eq!(early(&schedule, 4), (dt(2025, 1, 6, 8, 0), dt(2025, 1, 6, 17, 0)));
}

#[test]
fn constraints_still_apply_after_an_actual_start() {
    let mut started = Task::new(1, "Started early", WorkDuration::days(1.0))
        .with_constraint(ConstraintType::StartNoEarlierThan, dt(2025, 1, 8, 8, 0));
    started.actual_start = Some(dt(2025, 1, 6, 10, 0));
    let mut pinned = Task::new(2, "Pinned finish", WorkDuration::days(1.0))
        .with_constraint(ConstraintType::MustFinishOn, dt(2025, 1, 9, 17, 0));
    pinned.actual_start = Some(dt(2025, 1, 6, 8, 0));

    let mut schedule = schedule_with(vec![started, pinned]);
    schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 1), (dt(2025, 1, 8, 8, 0), dt(2025, 1, 8, 17, 0)));
    assert_eq!(early(&schedule, 2), (dt(2025, 1, 9, 8, 0), dt(2025, 1, 9, 17, 0)));
}

#[test]
fn leveling_delay_pushes_the_finish_only() {
    let mut delayed = Task::new(1, "Delayed", WorkDuration::days(1.0));
    delayed.leveling_delay = WorkDuration::days(1.0);
    let mut schedule = schedule_with(vec![delayed]);
    schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 1), (dt(2025, 1, 6, 8, 0), dt(2025, 1, 7, 17, 0)));
}

#[test]
fn inactive_and_summary_tasks_are_skipped() {
    let mut inactive = Task::new(1, "Cancelled", WorkDuration::days(5.0));
    inactive.active = false;
    let mut summary = Task::new(2, "Phase", WorkDuration::days(10.0));
    summary.summary = true;
    let mut schedule = schedule_with(vec![
        inactive,
        summary,
        Task::new(3, "Work", WorkDuration::days(1.0)).with_predecessor(
            1,
            RelationType::FinishStart,
            WorkDuration::zero(),
        ),
    ]);
    let finish = schedule.forward_pass().unwrap();
    assert_eq!(early(&schedule, 3), (dt(2025, 1, 6, 8, 0), dt(2025, 1, 6, 17, 0)));
    assert_eq!(finish, dt(2025, 1, 6, 17, 0));
    assert!(schedule.task(1).unwrap().early_start.is_none());
    assert!(schedule.task(2).unwrap().early_start.is_none());
    assert_eq!(schedule.scheduled_order(), &[3]);
}

#[test]
fn empty_schedule_has_no_finish() {
    let mut schedule = Schedule::new();
    assert!(matches!(
        schedule.forward_pass(),
        Err(schedule_cpm::ScheduleError::Invariant(_))
    ));
}
