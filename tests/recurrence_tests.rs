use chrono::{Datelike, NaiveDate, Weekday};
use schedule_cpm::{
    CalendarException, CalendarRegistry, Ordinal, RecurrenceEnd, RecurrencePattern, RecurringData,
    TimeDefaults,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn mondays_and_wednesdays(end: RecurrenceEnd) -> CalendarException {
    CalendarException::non_working(d(2025, 1, 1), d(2025, 1, 1))
        .with_name("Site closed")
        .with_recurrence(RecurringData::new(
            d(2025, 1, 1),
            RecurrencePattern::Weekly {
                frequency: 1,
                days: vec![Weekday::Mon, Weekday::Wed],
            },
            end,
        ))
}

fn assert_sorted_and_disjoint(expanded: &[CalendarException]) {
    for pair in expanded.windows(2) {
        assert!(pair[0].to < pair[1].from, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
}

#[test]
fn weekly_rule_over_a_year() {
    let exception = mondays_and_wednesdays(RecurrenceEnd::Until(d(2025, 12, 31)));
    let expanded = exception.expand();

    // 2025 starts on a Wednesday: 52 Mondays and 53 Wednesdays.
    assert_eq!(expanded.len(), 105);
    assert_eq!(expanded.first().map(|e| e.from), Some(d(2025, 1, 1)));
    assert_eq!(expanded.last().map(|e| e.from), Some(d(2025, 12, 31)));
    assert!(expanded.iter().all(|e| {
        matches!(e.from.weekday(), Weekday::Mon | Weekday::Wed) && e.recurrence.is_none()
    }));
    assert!(expanded.iter().all(|e| e.name.as_deref() == Some("Site closed")));
    assert_sorted_and_disjoint(&expanded);
}

#[test]
fn weekly_rule_with_occurrence_count() {
    let expanded = mondays_and_wednesdays(RecurrenceEnd::Occurrences(10)).expand();
    assert_eq!(expanded.len(), 10);
    assert_eq!(expanded.last().map(|e| e.from), Some(d(2025, 2, 3)));
    assert_sorted_and_disjoint(&expanded);
}

#[test]
fn recurring_exception_shapes_the_calendar() {
    let mut registry = CalendarRegistry::with_standard_calendar(TimeDefaults::default(), 1);
    registry
        .update(1, |c| {
            c.add_exception(mondays_and_wednesdays(RecurrenceEnd::Until(d(2025, 12, 31))))
        })
        .unwrap();
    let cal = registry.calendar(1).unwrap();

    // January 2025 has 23 weekdays, 4 Mondays and 5 Wednesdays.
    assert_eq!(cal.get_duration_in_days(d(2025, 1, 1), d(2025, 1, 31)), 14);
    assert!(!cal.is_working_date(d(2025, 6, 16)));
    assert!(cal.is_working_date(d(2025, 6, 17)));
    // The rule ends with the year.
    assert!(cal.is_working_date(d(2026, 1, 5)));
}

#[test]
fn multi_day_occurrences_keep_their_span() {
    let first_friday = RecurringData::new(
        d(2025, 2, 1),
        RecurrencePattern::MonthlyRelative {
            frequency: 1,
            ordinal: Ordinal::First,
            day: Weekday::Fri,
        },
        RecurrenceEnd::Occurrences(3),
    );
    let shutdown = CalendarException::non_working(d(2025, 2, 7), d(2025, 2, 8))
        .with_recurrence(first_friday);
    let expanded = shutdown.expand();
    let spans: Vec<(NaiveDate, NaiveDate)> = expanded.iter().map(|e| (e.from, e.to)).collect();
    assert_eq!(
        spans,
        vec![
            (d(2025, 2, 7), d(2025, 2, 8)),
            (d(2025, 3, 7), d(2025, 3, 8)),
            (d(2025, 4, 4), d(2025, 4, 5)),
        ]
    );
}

#[test]
fn yearly_rules() {
    let christmas = RecurringData::new(
        d(2025, 1, 1),
        RecurrencePattern::YearlyAbsolute { month: 12, day: 25 },
        RecurrenceEnd::Occurrences(3),
    );
    assert_eq!(christmas.occurrences(), vec![d(2025, 12, 25), d(2026, 12, 25), d(2027, 12, 25)]);

    let memorial_day = RecurringData::new(
        d(2025, 1, 1),
        RecurrencePattern::YearlyRelative {
            ordinal: Ordinal::Last,
            day: Weekday::Mon,
            month: 5,
        },
        RecurrenceEnd::Until(d(2026, 12, 31)),
    );
    assert_eq!(memorial_day.occurrences(), vec![d(2025, 5, 26), d(2026, 5, 25)]);
}
