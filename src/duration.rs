use crate::calendar::CalendarError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_HOUR: f64 = 60.0;
const ELAPSED_MINUTES_PER_DAY: f64 = 24.0 * 60.0;
const ELAPSED_DAYS_PER_MONTH: f64 = 30.0;
const ELAPSED_DAYS_PER_YEAR: f64 = 365.0;

/// Supplies the minute counts used to convert calendar-relative units.
///
/// Implemented by the project-wide `TimeDefaults` and by each
/// `EffectiveCalendar`, which layers its own overrides on top.
pub trait UnitSettings {
    fn minutes_per_day(&self) -> u32;
    fn minutes_per_week(&self) -> u32;
    fn minutes_per_month(&self) -> u32;
    fn minutes_per_year(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
    ElapsedMinutes,
    ElapsedHours,
    ElapsedDays,
    ElapsedWeeks,
    ElapsedMonths,
    ElapsedYears,
    /// Percentage of another duration. Carried for completeness of the unit
    /// set but rejected by all calendar arithmetic.
    Percent,
    ElapsedPercent,
}

impl TimeUnit {
    /// Elapsed units run on wall-clock time and ignore working calendars.
    pub fn is_elapsed(self) -> bool {
        matches!(
            self,
            TimeUnit::ElapsedMinutes
                | TimeUnit::ElapsedHours
                | TimeUnit::ElapsedDays
                | TimeUnit::ElapsedWeeks
                | TimeUnit::ElapsedMonths
                | TimeUnit::ElapsedYears
                | TimeUnit::ElapsedPercent
        )
    }

    pub fn code(self) -> &'static str {
        match self {
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
            TimeUnit::Weeks => "w",
            TimeUnit::Months => "mo",
            TimeUnit::Years => "y",
            TimeUnit::ElapsedMinutes => "em",
            TimeUnit::ElapsedHours => "eh",
            TimeUnit::ElapsedDays => "ed",
            TimeUnit::ElapsedWeeks => "ew",
            TimeUnit::ElapsedMonths => "emo",
            TimeUnit::ElapsedYears => "ey",
            TimeUnit::Percent => "%",
            TimeUnit::ElapsedPercent => "e%",
        }
    }

    /// Number of minutes in one unit. Calendar-relative units read their
    /// factor from `settings`; elapsed units use fixed wall-clock factors.
    pub fn minutes_per_unit(self, settings: &impl UnitSettings) -> Result<f64, CalendarError> {
        let factor = match self {
            TimeUnit::Minutes | TimeUnit::ElapsedMinutes => 1.0,
            TimeUnit::Hours | TimeUnit::ElapsedHours => MINUTES_PER_HOUR,
            TimeUnit::Days => f64::from(settings.minutes_per_day()),
            TimeUnit::Weeks => f64::from(settings.minutes_per_week()),
            TimeUnit::Months => f64::from(settings.minutes_per_month()),
            TimeUnit::Years => f64::from(settings.minutes_per_year()),
            TimeUnit::ElapsedDays => ELAPSED_MINUTES_PER_DAY,
            TimeUnit::ElapsedWeeks => 7.0 * ELAPSED_MINUTES_PER_DAY,
            TimeUnit::ElapsedMonths => ELAPSED_DAYS_PER_MONTH * ELAPSED_MINUTES_PER_DAY,
            TimeUnit::ElapsedYears => ELAPSED_DAYS_PER_YEAR * ELAPSED_MINUTES_PER_DAY,
            TimeUnit::Percent | TimeUnit::ElapsedPercent => {
                return Err(CalendarError::UnsupportedUnit(self.code().to_string()));
            }
        };
        Ok(factor)
    }

    /// Converts a minute count into this unit. A zero minutes-per-unit
    /// factor yields zero rather than an error.
    pub fn from_minutes(
        self,
        minutes: f64,
        settings: &impl UnitSettings,
    ) -> Result<f64, CalendarError> {
        let factor = self.minutes_per_unit(settings)?;
        if factor == 0.0 {
            Ok(0.0)
        } else {
            Ok(minutes / factor)
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TimeUnit {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            "d" => TimeUnit::Days,
            "w" => TimeUnit::Weeks,
            "mo" => TimeUnit::Months,
            "y" => TimeUnit::Years,
            "em" => TimeUnit::ElapsedMinutes,
            "eh" => TimeUnit::ElapsedHours,
            "ed" => TimeUnit::ElapsedDays,
            "ew" => TimeUnit::ElapsedWeeks,
            "emo" => TimeUnit::ElapsedMonths,
            "ey" => TimeUnit::ElapsedYears,
            "%" => TimeUnit::Percent,
            "e%" => TimeUnit::ElapsedPercent,
            other => return Err(CalendarError::UnsupportedUnit(other.to_string())),
        };
        Ok(unit)
    }
}

/// A signed amount of time expressed in a `TimeUnit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkDuration {
    pub value: f64,
    pub unit: TimeUnit,
}

impl Default for WorkDuration {
    fn default() -> Self {
        Self::zero()
    }
}

impl WorkDuration {
    pub fn new(value: f64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    pub fn zero() -> Self {
        Self::new(0.0, TimeUnit::Days)
    }

    pub fn minutes(value: f64) -> Self {
        Self::new(value, TimeUnit::Minutes)
    }

    pub fn hours(value: f64) -> Self {
        Self::new(value, TimeUnit::Hours)
    }

    pub fn days(value: f64) -> Self {
        Self::new(value, TimeUnit::Days)
    }

    pub fn weeks(value: f64) -> Self {
        Self::new(value, TimeUnit::Weeks)
    }

    pub fn elapsed_days(value: f64) -> Self {
        Self::new(value, TimeUnit::ElapsedDays)
    }

    pub fn negate(self) -> Self {
        Self::new(-self.value, self.unit)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0.0
    }

    pub fn to_minutes(&self, settings: &impl UnitSettings) -> Result<f64, CalendarError> {
        Ok(self.value * self.unit.minutes_per_unit(settings)?)
    }

    pub fn convert_units(
        &self,
        target: TimeUnit,
        settings: &impl UnitSettings,
    ) -> Result<WorkDuration, CalendarError> {
        if target == self.unit {
            return Ok(*self);
        }
        let minutes = self.to_minutes(settings)?;
        Ok(WorkDuration::new(target.from_minutes(minutes, settings)?, target))
    }
}

impl fmt::Display for WorkDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TimeDefaults;

    #[test]
    fn converts_days_through_project_defaults() {
        let defaults = TimeDefaults::default();
        let two_days = WorkDuration::days(2.0);
        let hours = two_days.convert_units(TimeUnit::Hours, &defaults).unwrap();
        assert_eq!(hours, WorkDuration::hours(16.0));
        let weeks = WorkDuration::days(10.0)
            .convert_units(TimeUnit::Weeks, &defaults)
            .unwrap();
        assert!((weeks.value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn elapsed_units_ignore_working_settings() {
        let mut defaults = TimeDefaults::default();
        defaults.minutes_per_day = 300;
        let minutes = WorkDuration::elapsed_days(1.0).to_minutes(&defaults).unwrap();
        assert_eq!(minutes, 1440.0);
    }

    #[test]
    fn zero_factor_yields_zero() {
        let mut defaults = TimeDefaults::default();
        defaults.minutes_per_day = 0;
        let days = WorkDuration::hours(8.0)
            .convert_units(TimeUnit::Days, &defaults)
            .unwrap();
        assert_eq!(days.value, 0.0);
    }

    #[test]
    fn percent_units_are_rejected() {
        let defaults = TimeDefaults::default();
        let err = WorkDuration::new(50.0, TimeUnit::Percent)
            .to_minutes(&defaults)
            .unwrap_err();
        assert!(matches!(err, CalendarError::UnsupportedUnit(code) if code == "%"));
    }

    #[test]
    fn parses_unit_codes() {
        assert_eq!("ed".parse::<TimeUnit>().unwrap(), TimeUnit::ElapsedDays);
        assert_eq!("MO".parse::<TimeUnit>().unwrap(), TimeUnit::Months);
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }
}
