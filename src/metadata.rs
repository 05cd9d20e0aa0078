use crate::calendar::{CalendarId, TimeRange};
use crate::duration::UnitSettings;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STANDARD_CALENDAR_ID: CalendarId = 1;

#[derive(Error, Debug)]
pub enum ScheduleMetadataError {
    #[error("invalid time defaults: {0}")]
    InvalidTimeDefaults(String),

    #[error("failed to parse metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Project-wide unit conversions and working-hour defaults.
///
/// Calendars fall back to these values when neither they nor any ancestor
/// carries an explicit override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDefaults {
    pub minutes_per_day: u32,
    pub minutes_per_week: u32,
    pub days_per_month: u32,
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
    /// Hours used for a `Default` weekday on a calendar with no parent.
    pub default_hours: Vec<TimeRange>,
}

impl Default for TimeDefaults {
    fn default() -> Self {
        Self {
            minutes_per_day: 480,
            minutes_per_week: 2400,
            days_per_month: 20,
            default_start_time: TimeRange::time_of_day(8, 0),
            default_end_time: TimeRange::time_of_day(17, 0),
            default_hours: vec![
                TimeRange::from_hm(8, 0, 12, 0),
                TimeRange::from_hm(13, 0, 17, 0),
            ],
        }
    }
}

impl UnitSettings for TimeDefaults {
    fn minutes_per_day(&self) -> u32 {
        self.minutes_per_day
    }

    fn minutes_per_week(&self) -> u32 {
        self.minutes_per_week
    }

    fn minutes_per_month(&self) -> u32 {
        self.minutes_per_day.saturating_mul(self.days_per_month)
    }

    fn minutes_per_year(&self) -> u32 {
        self.minutes_per_month().saturating_mul(12)
    }
}

impl TimeDefaults {
    pub fn validate(&self) -> Result<(), ScheduleMetadataError> {
        if self.minutes_per_day == 0 {
            return Err(ScheduleMetadataError::InvalidTimeDefaults(
                "minutes_per_day must be > 0".to_string(),
            ));
        }
        if self.minutes_per_week == 0 {
            return Err(ScheduleMetadataError::InvalidTimeDefaults(
                "minutes_per_week must be > 0".to_string(),
            ));
        }
        if self.days_per_month == 0 {
            return Err(ScheduleMetadataError::InvalidTimeDefaults(
                "days_per_month must be > 0".to_string(),
            ));
        }
        if self.default_start_time >= self.default_end_time {
            return Err(ScheduleMetadataError::InvalidTimeDefaults(format!(
                "default start time {} must be before default end time {}",
                self.default_start_time, self.default_end_time
            )));
        }
        let mut previous_end = 0;
        for range in &self.default_hours {
            if range.start_ms() < previous_end {
                return Err(ScheduleMetadataError::InvalidTimeDefaults(format!(
                    "default hours must be ordered and non-overlapping (at {range})"
                )));
            }
            previous_end = range.end_ms();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleMetadata {
    pub project_name: String,
    pub project_description: String,
    /// Anchor for the forward pass.
    pub project_start: NaiveDateTime,
    /// Calendar used by tasks that do not name their own.
    pub default_calendar_id: CalendarId,
    pub time_defaults: TimeDefaults,
}

impl Default for ScheduleMetadata {
    fn default() -> Self {
        let time_defaults = TimeDefaults::default();
        let start_date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap_or_default();
        Self {
            project_name: "New Project".to_string(),
            project_description: "No description".to_string(),
            project_start: start_date.and_time(time_defaults.default_start_time),
            default_calendar_id: STANDARD_CALENDAR_ID,
            time_defaults,
        }
    }
}

impl ScheduleMetadata {
    /// Parse metadata from a JSON document. Missing fields take their
    /// defaults.
    pub fn from_json_str(content: &str) -> Result<Self, ScheduleMetadataError> {
        let metadata: ScheduleMetadata = serde_json::from_str(content)?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn validate(&self) -> Result<(), ScheduleMetadataError> {
        self.time_defaults.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_json_with_defaults() {
        let metadata = ScheduleMetadata::from_json_str(
            r#"{
                "project_name": "Bridge",
                "project_start": "2025-03-03T08:00:00",
                "time_defaults": { "minutes_per_day": 450 }
            }"#,
        )
        .unwrap();
        assert_eq!(metadata.project_name, "Bridge");
        assert_eq!(metadata.time_defaults.minutes_per_day, 450);
        assert_eq!(metadata.time_defaults.minutes_per_week, 2400);
        assert_eq!(metadata.default_calendar_id, STANDARD_CALENDAR_ID);
        assert_eq!(metadata.time_defaults.minutes_per_month(), 450 * 20);
    }

    #[test]
    fn rejects_zero_minutes_per_day() {
        let json = r#"{ "time_defaults": { "minutes_per_day": 0 } }"#;
        let err = ScheduleMetadata::from_json_str(json).unwrap_err();
        assert!(matches!(err, ScheduleMetadataError::InvalidTimeDefaults(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = ScheduleMetadata::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ScheduleMetadataError::Parse(_)));
    }
}
