//! Working-time arithmetic over an `EffectiveCalendar`.
//!
//! Positions within a day are carried as milliseconds from that day's
//! midnight. A range that crosses midnight keeps its owning day, so a
//! position may exceed `DAY_MS` while it sits in the part of the range
//! that spills into the next date.

use super::cache::DateWalkMemo;
use super::effective::EffectiveCalendar;
use super::hours::{self, DAY_MS, MS_PER_MINUTE};
use super::CalendarError;
use crate::duration::{TimeUnit, WorkDuration};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::warn;

/// Consecutive non-working days a walk will step over before the calendar
/// is treated as having no working time at all.
pub const MAX_NONWORKING_DAYS: u32 = 1000;

/// Backward walks give up after this many days when the weekly pattern
/// has no working day.
const WEEK_PROBE_DAYS: u32 = 7;

/// Upper bound on a single day's position: a range starting just before
/// midnight and ending just before the next one.
const DAY_SPAN_MS: i64 = 2 * DAY_MS;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn minutes_to_ms(minutes: f64) -> i64 {
    (minutes * MS_PER_MINUTE as f64).round() as i64
}

impl<'a> EffectiveCalendar<'a> {
    /// Working time on a single date.
    pub fn get_work_on(
        &self,
        date: NaiveDate,
        unit: TimeUnit,
    ) -> Result<WorkDuration, CalendarError> {
        let ms = hours::total_ms(self.effective_hours(date));
        self.ms_to_duration(ms, unit)
    }

    /// Working time between two instants. The sign follows the argument
    /// order: `get_work(b, a)` is the negation of `get_work(a, b)`.
    pub fn get_work(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        unit: TimeUnit,
    ) -> Result<WorkDuration, CalendarError> {
        let (from, to, negate) = if start > end {
            (end, start, true)
        } else {
            (start, end, false)
        };
        let ms = self.working_ms_between(from, to);
        let duration = self.ms_to_duration(ms, unit)?;
        Ok(if negate && ms != 0 {
            duration.negate()
        } else {
            duration
        })
    }

    fn ms_to_duration(&self, ms: i64, unit: TimeUnit) -> Result<WorkDuration, CalendarError> {
        let minutes = ms as f64 / MS_PER_MINUTE as f64;
        Ok(WorkDuration::new(unit.from_minutes(minutes, self)?, unit))
    }

    fn working_ms_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
        if from >= to {
            return 0;
        }
        if let Some(&ms) = self.calendar().cache().working_ms.get(&(from, to)) {
            return ms;
        }

        // Each day's ranges are measured against the window expressed in
        // that day's own coordinates. The day before `from` is included
        // for ranges spilling past midnight.
        let start_day = from.date();
        let end_day = to.date();
        let window_start = hours::ms_of_day(from.time());
        let window_end = (end_day - start_day).num_days() * DAY_MS + hours::ms_of_day(to.time());

        let mut total = 0;
        let mut day = start_day.pred_opt().unwrap_or(start_day);
        while day <= end_day {
            let offset = (day - start_day).num_days() * DAY_MS;
            let local_start = window_start - offset;
            let local_end = window_end - offset;
            let day_hours = self.effective_hours(day);
            if !day_hours.is_empty() {
                total += if local_start <= 0 && local_end >= DAY_SPAN_MS {
                    hours::total_ms(day_hours)
                } else {
                    hours::window_ms(day_hours, local_start, local_end)
                };
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        self.calendar().cache().working_ms.insert((from, to), total);
        total
    }

    /// The instant reached by consuming `duration` of working time from
    /// `start`.
    ///
    /// Elapsed units are added as wall-clock time. Negative durations walk
    /// backwards through `get_start_date`, falling back to `start` if the
    /// calendar has no working time. With `return_next_work_start`, an
    /// instant at the end of a working period moves to the start of the
    /// next one.
    pub fn get_date(
        &self,
        start: NaiveDateTime,
        duration: WorkDuration,
        return_next_work_start: bool,
    ) -> Result<NaiveDateTime, CalendarError> {
        if duration.unit.is_elapsed() {
            let minutes = duration.to_minutes(self.defaults())?;
            return Ok(start + Duration::milliseconds(minutes_to_ms(minutes)));
        }
        if duration.is_negative() {
            return Ok(self.get_start_date(start, duration.negate())?.unwrap_or(start));
        }

        let minutes = round2(duration.to_minutes(self.defaults())?);
        if minutes <= 0.0 {
            return Ok(if return_next_work_start {
                self.next_work_start(start)
            } else {
                start
            });
        }

        let memo = self.calendar().cache().last_walk;
        let (cursor, remaining) = match memo {
            Some(memo) if memo.start == start && minutes >= memo.minutes => {
                (memo.result, minutes_to_ms(minutes) - minutes_to_ms(memo.minutes))
            }
            _ => (start, minutes_to_ms(minutes)),
        };

        let result = if remaining > 0 {
            self.walk_forward(start, cursor, remaining)
        } else {
            cursor
        };
        self.calendar().cache().last_walk = Some(DateWalkMemo {
            start,
            minutes,
            result,
        });

        Ok(if return_next_work_start {
            self.next_work_start(result)
        } else {
            result
        })
    }

    /// Consumes `remaining` ms of working time from `cursor`.
    ///
    /// When no working time turns up within `MAX_NONWORKING_DAYS`
    /// consecutive days, the walk stops and returns the working start of the
    /// day after `origin`, as if no work remained.
    fn walk_forward(
        &self,
        origin: NaiveDateTime,
        cursor: NaiveDateTime,
        mut remaining: i64,
    ) -> NaiveDateTime {
        let (mut day, mut position) = self.locate(cursor);
        let mut nonworking_days = 0;

        loop {
            let day_hours = self.effective_hours(day);
            let available = hours::window_ms(day_hours, position, DAY_SPAN_MS);
            if available >= remaining {
                let mut left = remaining;
                for range in day_hours {
                    let from = range.start_ms().max(position);
                    let chunk = range.end_ms() - from;
                    if chunk <= 0 {
                        continue;
                    }
                    if left <= chunk {
                        return hours::at_ms(day, from + left);
                    }
                    left -= chunk;
                }
            }
            remaining -= available;

            if available > 0 {
                nonworking_days = 0;
            } else {
                nonworking_days += 1;
            }
            let Some(next) = day.succ_opt() else {
                return hours::at_ms(day, position);
            };
            day = next;
            position = 0;
            if nonworking_days > MAX_NONWORKING_DAYS {
                warn!(
                    calendar = self.id(),
                    "no working time found within {MAX_NONWORKING_DAYS} days; abandoning date walk"
                );
                let fallback = origin.date().succ_opt().unwrap_or(day);
                return fallback.and_time(self.start_time(fallback));
            }
        }
    }

    /// Expresses `instant` as a (day, position) pair, attributing it to the
    /// previous day when it falls inside a range spilling past midnight.
    fn locate(&self, instant: NaiveDateTime) -> (NaiveDate, i64) {
        let day = instant.date();
        let position = hours::ms_of_day(instant.time());
        if let Some(previous) = day.pred_opt() {
            let spilled = position + DAY_MS;
            let in_spill = self
                .effective_hours(previous)
                .iter()
                .any(|range| range.end_ms() > spilled && range.start_ms() <= spilled);
            if in_spill {
                return (previous, spilled);
            }
        }
        (day, position)
    }

    /// The instant from which `duration` of working time ends at `finish`.
    ///
    /// Returns `None` when the calendar has no working time to walk back
    /// through.
    pub fn get_start_date(
        &self,
        finish: NaiveDateTime,
        duration: WorkDuration,
    ) -> Result<Option<NaiveDateTime>, CalendarError> {
        if duration.unit.is_elapsed() {
            let minutes = duration.to_minutes(self.defaults())?;
            return Ok(Some(finish - Duration::milliseconds(minutes_to_ms(minutes))));
        }
        let minutes = round2(duration.to_minutes(self.defaults())?);
        if minutes < 0.0 {
            return Ok(Some(self.get_date(finish, duration.negate(), false)?));
        }
        let mut remaining = minutes_to_ms(minutes);
        if remaining == 0 {
            return Ok(Some(finish));
        }

        let mut day = finish.date();
        let mut position = hours::ms_of_day(finish.time());
        let mut steps = 0;
        let mut nonworking_days = 0;

        loop {
            let day_hours = self.effective_hours(day);
            let available = hours::window_ms(day_hours, 0, position);
            if available >= remaining {
                let mut left = remaining;
                for range in day_hours.iter().rev() {
                    let to = range.end_ms().min(position);
                    let chunk = to - range.start_ms();
                    if chunk <= 0 {
                        continue;
                    }
                    if left <= chunk {
                        return Ok(Some(hours::at_ms(day, to - left)));
                    }
                    left -= chunk;
                }
            }
            remaining -= available;

            if available > 0 {
                nonworking_days = 0;
            } else {
                nonworking_days += 1;
            }
            steps += 1;
            if steps > WEEK_PROBE_DAYS && !self.has_working_weekday() {
                return Ok(None);
            }
            if nonworking_days > MAX_NONWORKING_DAYS {
                warn!(
                    calendar = self.id(),
                    "no working time found within {MAX_NONWORKING_DAYS} days walking backwards"
                );
                return Ok(None);
            }
            let Some(previous) = day.pred_opt() else {
                return Ok(None);
            };
            // The previous day's ranges may spill into the part of `day`
            // already walked.
            position = DAY_MS + position.min(DAY_MS);
            day = previous;
        }
    }

    /// The first working instant at or after `instant`.
    ///
    /// An instant exactly at the end of a working period is not working
    /// time, so it moves on to the start of the next period.
    pub fn next_work_start(&self, instant: NaiveDateTime) -> NaiveDateTime {
        let (day, position) = self.locate(instant);
        for range in self.effective_hours(day) {
            if position < range.end_ms() {
                return hours::at_ms(day, range.start_ms().max(position));
            }
        }
        // Ranges of the located day are exhausted; when the instant sat in
        // a spill, the instant's own date may still have later ranges.
        let mut date = day;
        if date < instant.date() {
            date = instant.date();
            let position = hours::ms_of_day(instant.time());
            for range in self.effective_hours(date) {
                if position < range.end_ms() {
                    return hours::at_ms(date, range.start_ms().max(position));
                }
            }
        }
        for _ in 0..=MAX_NONWORKING_DAYS {
            let Some(next) = date.succ_opt() else {
                break;
            };
            date = next;
            if let Some(first) = self.effective_hours(date).first() {
                return hours::at_ms(date, first.start_ms());
            }
        }
        warn!(calendar = self.id(), %instant, "no next working period found");
        instant
    }

    /// The last working instant at or before `instant`.
    ///
    /// An instant exactly at the start of a working period moves back to
    /// the end of the previous period.
    pub fn previous_work_finish(&self, instant: NaiveDateTime) -> NaiveDateTime {
        let day = instant.date();
        let position = hours::ms_of_day(instant.time());
        let previous = day.pred_opt();
        let spilled = position + DAY_MS;

        let today = self.effective_hours(day);
        let yesterday = previous.map(|p| self.effective_hours(p)).unwrap_or(&[]);

        let inside = today
            .iter()
            .any(|r| r.start_ms() < position && position <= r.end_ms())
            || yesterday
                .iter()
                .any(|r| r.start_ms() < spilled && spilled <= r.end_ms());
        if inside {
            return instant;
        }

        let own = today
            .iter()
            .filter(|r| r.end_ms() <= position)
            .map(|r| hours::at_ms(day, r.end_ms()))
            .max();
        let spill = previous.and_then(|p| {
            yesterday
                .iter()
                .filter(|r| r.end_ms() > DAY_MS && r.end_ms() <= spilled)
                .map(|r| hours::at_ms(p, r.end_ms()))
                .max()
        });
        if let Some(found) = own.max(spill) {
            return found;
        }

        let mut date = day;
        for _ in 0..=MAX_NONWORKING_DAYS {
            let Some(prior) = date.pred_opt() else {
                break;
            };
            date = prior;
            if let Some(end) = self.effective_hours(date).iter().map(|r| r.end_ms()).max() {
                return hours::at_ms(date, end);
            }
        }
        warn!(calendar = self.id(), %instant, "no previous working period found");
        instant
    }
}
